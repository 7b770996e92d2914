//! Outbound signals: user-facing notifications and navigation requests.
//!
//! The orchestrator only records these; rendering toasts and switching screens
//! belongs to whoever drains them.

use bevy_ecs::prelude::Resource;

use crate::ride::RideId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
}

/// One short human-readable message, emitted once per state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub at_ms: u64,
    pub level: NotificationLevel,
    pub message: String,
}

/// Screen the surrounding shell should show next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    RideCompleted(RideId),
    RideCancelled(RideId),
    /// Tracking was opened without a usable ride.
    NoActiveRide,
    DriverDashboard,
}

#[derive(Debug, Default, Resource)]
pub struct Signals {
    pub notifications: Vec<Notification>,
    pub navigations: Vec<Navigation>,
}

impl Signals {
    pub fn notify(&mut self, at_ms: u64, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(at_ms, ?level, %message, "notification");
        self.notifications.push(Notification {
            at_ms,
            level,
            message,
        });
    }

    pub fn navigate(&mut self, target: Navigation) {
        tracing::debug!(?target, "navigation requested");
        self.navigations.push(target);
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn drain_navigations(&mut self) -> Vec<Navigation> {
        std::mem::take(&mut self.navigations)
    }

    pub fn last_navigation(&self) -> Option<Navigation> {
        self.navigations.last().copied()
    }
}
