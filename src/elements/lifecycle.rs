/// Where a viewer is between construction and a live map.
///
/// The path forward is strictly ordered: an unattached viewer connects,
/// waits for its displayed size if that was not knowable up front, waits
/// for the signal to build (automatic for built-in projections, explicit
/// for custom ones), constructs its engine and goes active. Disconnecting
/// returns to `Unattached` from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unattached,
    AwaitingDimensions,
    AwaitingSignal,
    EngineConstructed,
    Active,
}

impl LifecycleState {
    pub fn is_connected(&self) -> bool {
        !matches!(self, LifecycleState::Unattached)
    }

    pub fn has_engine(&self) -> bool {
        matches!(
            self,
            LifecycleState::EngineConstructed | LifecycleState::Active
        )
    }
}
