use serde::Serialize;
use serde_json::Map;

use super::{humanize, now, EntityKind, EntityOptions, EntitySnapshot};
use crate::error::HeaterResult;
use crate::heater::{Command, RinnaiHeater};

/// Which step a button sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonKind {
    Increase,
    Decrease,
}

impl ButtonKind {
    fn key(&self) -> &'static str {
        match self {
            Self::Increase => "temperature_increase",
            Self::Decrease => "temperature_decrease",
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            Self::Increase => "mdi:thermometer-chevron-up",
            Self::Decrease => "mdi:thermometer-chevron-down",
        }
    }

    pub fn command(&self) -> Command {
        match self {
            Self::Increase => Command::Increase,
            Self::Decrease => Command::Decrease,
        }
    }
}

/// Stateless temperature step button.
#[derive(Debug, Clone)]
pub struct ButtonEntity {
    heater: RinnaiHeater,
    kind: ButtonKind,
    unique_id: String,
    name: String,
    options: EntityOptions,
}

impl ButtonEntity {
    pub fn new(heater: RinnaiHeater, serial_number: &str, kind: ButtonKind) -> Self {
        Self {
            heater,
            kind,
            unique_id: format!("{}{}", kind.key(), serial_number),
            name: humanize(kind.key()),
            options: EntityOptions {
                icon: Some(kind.icon()),
                ..EntityOptions::default()
            },
        }
    }

    pub fn kind(&self) -> ButtonKind {
        self.kind
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &EntityOptions {
        &self.options
    }

    pub fn heater(&self) -> &RinnaiHeater {
        &self.heater
    }

    /// Buttons can always be pressed.
    pub fn available(&self) -> bool {
        true
    }

    pub async fn press(&self) -> HeaterResult<usize> {
        self.heater.send(self.kind.command()).await
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            kind: EntityKind::Button,
            available: true,
            state: None,
            unit: None,
            attributes: Map::new(),
            timestamp: now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Endpoint;
    use crate::test_support::{offline_heater, RecordingTransport};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_press_sends_command() {
        let transport = Arc::new(RecordingTransport::with(&[
            (Endpoint::Inc, "1,0,7,3800,0,0,0"),
            (Endpoint::Dec, "1,0,7,3800,0,0,0"),
        ]));
        let heater = RinnaiHeater::with_transport("t", Duration::from_secs(15), transport.clone());

        let up = ButtonEntity::new(heater.clone(), "SN1", ButtonKind::Increase);
        let down = ButtonEntity::new(heater.clone(), "SN1", ButtonKind::Decrease);
        up.press().await.unwrap();
        down.press().await.unwrap();

        assert_eq!(*transport.calls.lock(), vec![Endpoint::Inc, Endpoint::Dec]);
        assert_eq!(heater.get("target_temperature_raw").as_deref(), Some("7"));
    }

    #[test]
    fn test_identity() {
        let up = ButtonEntity::new(offline_heater(), "SN1", ButtonKind::Increase);
        assert_eq!(up.unique_id(), "temperature_increaseSN1");
        assert_eq!(up.name(), "Temperature increase");
        assert_eq!(up.options().icon, Some("mdi:thermometer-chevron-up"));
        assert!(up.available());
        assert!(up.snapshot().state.is_none());
    }

    #[tokio::test]
    async fn test_press_failure_clears_state() {
        let heater = crate::test_support::heater_with_bus(&[(0, "1")]);
        let down = ButtonEntity::new(heater.clone(), "SN1", ButtonKind::Decrease);
        assert!(down.press().await.is_err());
        assert!(heater.state().is_empty());
    }
}
