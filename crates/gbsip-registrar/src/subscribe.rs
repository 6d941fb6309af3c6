// gbsip-rs - GB28181 SIP services for Rust
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event-subscription follow-up for registered devices.
//!
//! After a camera registers, the platform typically subscribes to its
//! alarm events. [`EventSubscription`] is the seam a SUBSCRIBE/NOTIFY
//! layer drives; [`AlarmSubscription`] implements it for the GB28181
//! alarm package with MANSCDP XML notify bodies.

use chrono::{DateTime, Utc};
use smol_str::SmolStr;

/// One device-originated event a subscription may report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorEvent {
    pub device_id: SmolStr,
    pub alarm_method: SmolStr,
    pub alarm_type: SmolStr,
    pub priority: u8,
    pub time: DateTime<Utc>,
    pub description: SmolStr,
}

/// Behaviour required of an event-package subscription.
pub trait EventSubscription: Send + Sync {
    /// SIP event package this subscription serves (Event header value).
    fn event_package(&self) -> &str;

    /// Content-Type of NOTIFY bodies.
    fn notify_content_type(&self) -> &str;

    /// Whether the next NOTIFY must carry full rather than partial state.
    fn full_state(&self) -> bool;

    /// Whether this subscription wants the event at all.
    fn monitor_filter(&self, event: &MonitorEvent) -> bool;

    /// Queues an event for the next NOTIFY; returns false when the filter
    /// rejected it.
    fn add_monitor_event(&mut self, event: MonitorEvent) -> bool;

    /// Renders the pending NOTIFY body.
    fn notify_body(&mut self) -> String;

    /// Marks the pending events as delivered.
    fn notification_sent(&mut self);
}

/// GB28181 alarm subscription for one device.
pub struct AlarmSubscription {
    device_id: SmolStr,
    priority_floor: u8,
    sn: u32,
    pending: Vec<MonitorEvent>,
    sent_initial: bool,
}

impl AlarmSubscription {
    pub fn new(device_id: impl Into<SmolStr>) -> Self {
        Self {
            device_id: device_id.into(),
            priority_floor: 0,
            sn: 1,
            pending: Vec::new(),
            sent_initial: false,
        }
    }

    /// Discards alarms below this priority.
    pub fn with_priority_floor(mut self, floor: u8) -> Self {
        self.priority_floor = floor;
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl EventSubscription for AlarmSubscription {
    fn event_package(&self) -> &str {
        "presence"
    }

    fn notify_content_type(&self) -> &str {
        "Application/MANSCDP+xml"
    }

    fn full_state(&self) -> bool {
        // The first NOTIFY of a dialog reports full state.
        !self.sent_initial
    }

    fn monitor_filter(&self, event: &MonitorEvent) -> bool {
        event.device_id == self.device_id && event.priority >= self.priority_floor
    }

    fn add_monitor_event(&mut self, event: MonitorEvent) -> bool {
        if !self.monitor_filter(&event) {
            return false;
        }
        self.pending.push(event);
        true
    }

    fn notify_body(&mut self) -> String {
        let mut body = String::new();
        body.push_str("<?xml version=\"1.0\"?>\n<Notify>\n<CmdType>Alarm</CmdType>\n");
        body.push_str(&format!("<SN>{}</SN>\n", self.sn));
        body.push_str(&format!("<DeviceID>{}</DeviceID>\n", self.device_id));
        for event in &self.pending {
            body.push_str(&format!(
                "<AlarmMethod>{}</AlarmMethod>\n<AlarmType>{}</AlarmType>\n<AlarmPriority>{}</AlarmPriority>\n<AlarmTime>{}</AlarmTime>\n<AlarmDescription>{}</AlarmDescription>\n",
                event.alarm_method,
                event.alarm_type,
                event.priority,
                event.time.format("%Y-%m-%dT%H:%M:%S"),
                event.description,
            ));
        }
        body.push_str("</Notify>\n");
        body
    }

    fn notification_sent(&mut self) {
        self.pending.clear();
        self.sn += 1;
        self.sent_initial = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alarm(device_id: &str, priority: u8) -> MonitorEvent {
        MonitorEvent {
            device_id: SmolStr::new(device_id),
            alarm_method: SmolStr::new("5"),
            alarm_type: SmolStr::new("2"),
            priority,
            time: Utc::now(),
            description: SmolStr::new("motion detected"),
        }
    }

    #[test]
    fn filters_by_device_and_priority() {
        let mut sub = AlarmSubscription::new("34020000001320000001").with_priority_floor(2);

        assert!(sub.add_monitor_event(alarm("34020000001320000001", 3)));
        assert!(!sub.add_monitor_event(alarm("34020000001320000001", 1)));
        assert!(!sub.add_monitor_event(alarm("34020000009999999999", 3)));
        assert_eq!(sub.pending_count(), 1);
    }

    #[test]
    fn notify_body_is_manscdp_alarm() {
        let mut sub = AlarmSubscription::new("34020000001320000001");
        sub.add_monitor_event(alarm("34020000001320000001", 1));

        let body = sub.notify_body();
        assert!(body.contains("<CmdType>Alarm</CmdType>"));
        assert!(body.contains("<DeviceID>34020000001320000001</DeviceID>"));
        assert!(body.contains("<AlarmDescription>motion detected</AlarmDescription>"));
        assert_eq!(sub.notify_content_type(), "Application/MANSCDP+xml");
    }

    #[test]
    fn notification_sent_advances_state() {
        let mut sub = AlarmSubscription::new("34020000001320000001");
        sub.add_monitor_event(alarm("34020000001320000001", 1));
        assert!(sub.full_state());

        sub.notification_sent();
        assert_eq!(sub.pending_count(), 0);
        assert!(!sub.full_state());
        assert!(sub.notify_body().contains("<SN>2</SN>"));
    }
}
