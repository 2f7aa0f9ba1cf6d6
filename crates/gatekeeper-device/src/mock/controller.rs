//! Mock controller fleet for testing and development.
//!
//! Each registered device holds a list of card slots. Deleting a card leaves
//! an empty slot behind, the way real controllers do, so callers that walk
//! records by index see holes.

use crate::{DeviceError, Result, traits::ControllerApi};
use gatekeeper_core::{Card, CardNumber, CardSet, DeviceId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::trace;

/// Controller API call kinds, as recorded by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CardCount,
    CardByIndex,
    CardById,
    PutCard,
    DeleteCard,
}

impl Operation {
    /// Returns `true` for calls that change controller state.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::PutCard | Self::DeleteCard)
    }
}

/// Fault injected on writes (put or delete) of one card on one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Controller answers but refuses the write.
    Reject,
    /// Call times out.
    Timeout,
    /// Call fails with a communication error.
    Communication(String),
}

#[derive(Debug, Default)]
struct State {
    devices: HashMap<DeviceId, Vec<Option<Card>>>,
    unreachable: HashSet<DeviceId>,
    faults: HashMap<(DeviceId, CardNumber), Fault>,
    latency: HashMap<DeviceId, Duration>,
    calls: Vec<(DeviceId, Operation)>,
    in_flight: usize,
    peak_in_flight: usize,
}

impl State {
    fn slots(&self, device: DeviceId) -> Result<&Vec<Option<Card>>> {
        if self.unreachable.contains(&device) {
            return Err(DeviceError::unreachable(device.to_string()));
        }
        self.devices
            .get(&device)
            .ok_or_else(|| DeviceError::unreachable(device.to_string()))
    }

    fn slots_mut(&mut self, device: DeviceId) -> Result<&mut Vec<Option<Card>>> {
        if self.unreachable.contains(&device) {
            return Err(DeviceError::unreachable(device.to_string()));
        }
        self.devices
            .get_mut(&device)
            .ok_or_else(|| DeviceError::unreachable(device.to_string()))
    }

    fn fault(&self, device: DeviceId, card: CardNumber) -> Result<bool> {
        match self.faults.get(&(device, card)) {
            None => Ok(true),
            Some(Fault::Reject) => Ok(false),
            Some(Fault::Timeout) => Err(DeviceError::timeout(5000)),
            Some(Fault::Communication(message)) => Err(DeviceError::communication(message.clone())),
        }
    }
}

/// In-memory controller fleet implementing [`ControllerApi`].
///
/// # Examples
///
/// ```
/// use gatekeeper_core::{Card, CardNumber, DeviceId, Doors};
/// use gatekeeper_core::types::parse_date;
/// use gatekeeper_device::{ControllerApi, MockController};
///
/// #[tokio::main]
/// async fn main() -> gatekeeper_device::Result<()> {
///     let (api, handle) = MockController::new();
///     let device = DeviceId::new(12345).unwrap();
///
///     let card = Card::new(
///         CardNumber::new(65537),
///         parse_date("2020-01-02").unwrap(),
///         parse_date("2020-10-31").unwrap(),
///         Doors::from([true, false, false, false]),
///     );
///     handle.add_card(device, card.clone()).await;
///
///     assert_eq!(api.card_count(device).await?, 1);
///     assert_eq!(api.card_by_id(device, CardNumber::new(65537)).await?, Some(card));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockController {
    state: Arc<Mutex<State>>,
}

impl MockController {
    /// Create an empty mock fleet.
    ///
    /// Returns a tuple of (MockController, MockControllerHandle) where the
    /// handle seeds records, injects faults and inspects the final state.
    pub fn new() -> (Self, MockControllerHandle) {
        let state = Arc::new(Mutex::new(State::default()));
        let api = Self {
            state: Arc::clone(&state),
        };
        (api, MockControllerHandle { state })
    }

    /// Record the call, then simulate the round-trip latency for the device.
    async fn enter(&self, device: DeviceId, operation: Operation) {
        let latency = {
            let mut state = self.state.lock().await;
            state.calls.push((device, operation));
            state.in_flight += 1;
            state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
            state.latency.get(&device).copied()
        };

        trace!(device = %device, ?operation, "Mock controller call");

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn leave(&self) {
        let mut state = self.state.lock().await;
        state.in_flight = state.in_flight.saturating_sub(1);
    }

    async fn call<T>(
        &self,
        device: DeviceId,
        operation: Operation,
        f: impl FnOnce(&mut State) -> Result<T> + Send,
    ) -> Result<T> {
        self.enter(device, operation).await;
        let result = {
            let mut state = self.state.lock().await;
            f(&mut state)
        };
        self.leave().await;
        result
    }
}

impl ControllerApi for MockController {
    async fn card_count(&self, device: DeviceId) -> Result<u32> {
        self.call(device, Operation::CardCount, |state| {
            let count = state.slots(device)?.iter().flatten().count();
            u32::try_from(count).map_err(|_| DeviceError::invalid_data("card count overflow"))
        })
        .await
    }

    async fn card_by_index(&self, device: DeviceId, index: u32) -> Result<Option<Card>> {
        self.call(device, Operation::CardByIndex, |state| {
            let slots = state.slots(device)?;
            let Some(ix) = (index as usize).checked_sub(1) else {
                return Ok(None);
            };
            Ok(slots.get(ix).cloned().flatten())
        })
        .await
    }

    async fn card_by_id(&self, device: DeviceId, card: CardNumber) -> Result<Option<Card>> {
        self.call(device, Operation::CardById, |state| {
            Ok(state
                .slots(device)?
                .iter()
                .flatten()
                .find(|c| c.card_number == card)
                .cloned())
        })
        .await
    }

    async fn put_card(&self, device: DeviceId, card: Card) -> Result<bool> {
        self.call(device, Operation::PutCard, |state| {
            state.slots(device)?;
            if !state.fault(device, card.card_number)? {
                return Ok(false);
            }

            let slots = state.slots_mut(device)?;
            if let Some(slot) = slots
                .iter_mut()
                .find(|slot| matches!(slot, Some(c) if c.card_number == card.card_number))
            {
                *slot = Some(card);
            } else if let Some(slot) = slots.iter_mut().find(|slot| slot.is_none()) {
                *slot = Some(card);
            } else {
                slots.push(Some(card));
            }
            Ok(true)
        })
        .await
    }

    async fn delete_card(&self, device: DeviceId, card: CardNumber) -> Result<bool> {
        self.call(device, Operation::DeleteCard, |state| {
            state.slots(device)?;
            if !state.fault(device, card)? {
                return Ok(false);
            }

            let slots = state.slots_mut(device)?;
            match slots
                .iter_mut()
                .find(|slot| matches!(slot, Some(c) if c.card_number == card))
            {
                Some(slot) => {
                    *slot = None;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
        .await
    }
}

/// Handle for driving and inspecting a [`MockController`].
#[derive(Debug, Clone)]
pub struct MockControllerHandle {
    state: Arc<Mutex<State>>,
}

impl MockControllerHandle {
    /// Register a device with no cards.
    pub async fn add_device(&self, device: DeviceId) {
        self.state.lock().await.devices.entry(device).or_default();
    }

    /// Store a card on a device, registering the device if needed.
    ///
    /// An existing record for the same card number is overwritten in place.
    pub async fn add_card(&self, device: DeviceId, card: Card) {
        let mut state = self.state.lock().await;
        let slots = state.devices.entry(device).or_default();
        match slots
            .iter_mut()
            .find(|slot| matches!(slot, Some(c) if c.card_number == card.card_number))
        {
            Some(slot) => *slot = Some(card),
            None => slots.push(Some(card)),
        }
    }

    /// Append an empty index slot to a device, as left by a deleted record.
    pub async fn add_empty_slot(&self, device: DeviceId) {
        let mut state = self.state.lock().await;
        state.devices.entry(device).or_default().push(None);
    }

    /// Make every call to a device fail with `DeviceError::Unreachable`.
    pub async fn set_unreachable(&self, device: DeviceId, unreachable: bool) {
        let mut state = self.state.lock().await;
        if unreachable {
            state.unreachable.insert(device);
        } else {
            state.unreachable.remove(&device);
        }
    }

    /// Inject a fault on writes of one card on one device.
    pub async fn inject_fault(&self, device: DeviceId, card: CardNumber, fault: Fault) {
        self.state.lock().await.faults.insert((device, card), fault);
    }

    /// Remove all injected faults.
    pub async fn clear_faults(&self) {
        self.state.lock().await.faults.clear();
    }

    /// Delay every call to a device by `latency`.
    pub async fn set_latency(&self, device: DeviceId, latency: Duration) {
        self.state.lock().await.latency.insert(device, latency);
    }

    /// Current card records of a device.
    pub async fn cards(&self, device: DeviceId) -> CardSet {
        let state = self.state.lock().await;
        state
            .devices
            .get(&device)
            .map(|slots| {
                slots
                    .iter()
                    .flatten()
                    .map(|card| (card.card_number, card.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<(DeviceId, Operation)> {
        self.state.lock().await.calls.clone()
    }

    /// Number of put and delete calls made so far.
    pub async fn mutation_count(&self) -> usize {
        let state = self.state.lock().await;
        state.calls.iter().filter(|(_, op)| op.is_mutation()).count()
    }

    /// Highest number of calls that were in progress at the same time.
    pub async fn peak_in_flight(&self) -> usize {
        self.state.lock().await.peak_in_flight
    }
}
