use fadeplay_core::ChannelId;

/// A control parameter currently driven on a BGM channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveControl {
    pub name: String,
    pub channel: ChannelId,
}

/// Tracks the single control that is owned by the current BGM.
#[derive(Debug, Clone, Default)]
pub struct ControlCoordinator {
    active: Option<ActiveControl>,
}

impl ControlCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&ActiveControl> {
        self.active.as_ref()
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.name.as_str())
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active_name() == Some(name)
    }

    pub fn is_owned_by(&self, channel: ChannelId) -> bool {
        self.active.as_ref().is_some_and(|active| active.channel == channel)
    }

    /// Take ownership for `name` on `channel`, returning the previous owner.
    pub fn claim(&mut self, name: &str, channel: ChannelId) -> Option<ActiveControl> {
        self.active.replace(ActiveControl {
            name: name.to_string(),
            channel,
        })
    }

    pub fn release(&mut self) -> Option<ActiveControl> {
        self.active.take()
    }
}
