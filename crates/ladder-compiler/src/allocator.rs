//! First-fit device allocator.
//!
//! Each device type has a cursor that starts at zero (or at a configured
//! start address). A request for a new logical name takes the preferred
//! address or the cursor, advances past addresses that are already taken,
//! and moves the cursor just beyond the result. A logical name that was
//! allocated before always gets its original allocation back.

use ladder_common::{
    CounterConfig, DeviceAddress, DeviceAllocation, DeviceConfig, DeviceLimits, DeviceMap,
    DeviceType, LadderError, LadderResult, TimerConfig,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Issues unique device addresses for one synthesis run.
#[derive(Debug, Clone, Default)]
pub struct DeviceAllocator {
    limits: DeviceLimits,
    cursors: BTreeMap<DeviceType, u32>,
    taken: BTreeSet<DeviceAddress>,
    allocations: Vec<DeviceAllocation>,
    by_name: HashMap<String, usize>,
}

impl DeviceAllocator {
    /// Create an allocator with the default MELSEC-Q capacities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator from configuration: limits, start cursors and
    /// reserved addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if a reserved address is out of range or listed twice.
    pub fn with_config(config: &DeviceConfig) -> LadderResult<Self> {
        let mut allocator = Self {
            limits: config.limits,
            ..Self::default()
        };
        for start in &config.start {
            allocator.cursors.insert(start.device_type, start.address);
        }
        for &address in &config.reserved {
            allocator.reserve(address)?;
        }
        Ok(allocator)
    }

    /// Allocate a device for `name`.
    ///
    /// Returns the existing allocation unchanged if `name` was seen before.
    ///
    /// # Errors
    ///
    /// Returns [`LadderError::DeviceRange`] when no address below the
    /// type's capacity is free.
    pub fn allocate(
        &mut self,
        name: &str,
        device_type: DeviceType,
        comment: &str,
        timer: Option<TimerConfig>,
        preferred: Option<u32>,
    ) -> LadderResult<DeviceAllocation> {
        if let Some(existing) = self.get(name) {
            return Ok(existing.clone());
        }

        let limit = self.limits.limit(device_type);
        let mut address = preferred.unwrap_or_else(|| self.cursor(device_type));
        loop {
            if address >= limit {
                return Err(LadderError::DeviceRange {
                    device_type: device_type.to_string(),
                    reason: format!("no free address below {limit} for '{name}'"),
                });
            }
            if !self.taken.contains(&DeviceAddress::new(device_type, address)) {
                break;
            }
            address += 1;
        }

        let device = DeviceAddress::new(device_type, address);
        self.taken.insert(device);
        self.cursors.insert(device_type, address + 1);

        debug!(name, device = %device, "allocated device");

        let allocation = DeviceAllocation {
            logical_name: name.to_string(),
            address: device,
            comment: comment.to_string(),
            timer,
            counter: None,
        };
        self.by_name.insert(name.to_string(), self.allocations.len());
        self.allocations.push(allocation.clone());
        Ok(allocation)
    }

    /// Allocate an input (X) device.
    ///
    /// # Errors
    ///
    /// Returns an error if the X range is exhausted.
    pub fn allocate_input(&mut self, name: &str, comment: &str) -> LadderResult<DeviceAllocation> {
        self.allocate(name, DeviceType::X, comment, None, None)
    }

    /// Allocate an output (Y) device.
    ///
    /// # Errors
    ///
    /// Returns an error if the Y range is exhausted.
    pub fn allocate_output(
        &mut self,
        name: &str,
        comment: &str,
    ) -> LadderResult<DeviceAllocation> {
        self.allocate(name, DeviceType::Y, comment, None, None)
    }

    /// Allocate an internal relay (M) device.
    ///
    /// # Errors
    ///
    /// Returns an error if the M range is exhausted.
    pub fn allocate_relay(&mut self, name: &str, comment: &str) -> LadderResult<DeviceAllocation> {
        self.allocate(name, DeviceType::M, comment, None, None)
    }

    /// Allocate a timer and derive its K preset from `seconds`.
    ///
    /// # Errors
    ///
    /// Returns an error if the T range is exhausted.
    pub fn allocate_timer(
        &mut self,
        name: &str,
        seconds: f64,
        comment: &str,
    ) -> LadderResult<DeviceAllocation> {
        let timer = TimerConfig::from_seconds(seconds, comment);
        self.allocate(name, DeviceType::T, comment, Some(timer), None)
    }

    /// Allocate a counter with a count preset.
    ///
    /// # Errors
    ///
    /// Returns an error if `count` is zero or the C range is exhausted.
    pub fn allocate_counter(
        &mut self,
        name: &str,
        count: u32,
        comment: &str,
    ) -> LadderResult<DeviceAllocation> {
        if let Some(existing) = self.get(name) {
            return Ok(existing.clone());
        }
        let counter = CounterConfig::new(count, comment)?;
        let mut allocation = self.allocate(name, DeviceType::C, comment, None, None)?;
        allocation.counter = Some(counter);
        if let Some(&index) = self.by_name.get(name) {
            self.allocations[index].counter.clone_from(&allocation.counter);
        }
        Ok(allocation)
    }

    /// Reserve an address so the allocator never hands it out.
    ///
    /// # Errors
    ///
    /// Returns [`LadderError::DeviceConflict`] if the address is already
    /// taken, or [`LadderError::DeviceRange`] if it exceeds the type's
    /// capacity.
    pub fn reserve(&mut self, address: DeviceAddress) -> LadderResult<()> {
        let limit = self.limits.limit(address.device_type);
        if address.address >= limit {
            return Err(LadderError::DeviceRange {
                device_type: address.device_type.to_string(),
                reason: format!("address {address} exceeds capacity {limit}"),
            });
        }
        if !self.taken.insert(address) {
            return Err(LadderError::DeviceConflict {
                address: address.to_string(),
            });
        }
        debug!(device = %address, "reserved device");
        Ok(())
    }

    /// Look up a live allocation by logical name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DeviceAllocation> {
        self.by_name.get(name).map(|&i| &self.allocations[i])
    }

    /// Current cursor for a device type.
    #[must_use]
    pub fn cursor(&self, device_type: DeviceType) -> u32 {
        self.cursors.get(&device_type).copied().unwrap_or(0)
    }

    /// Snapshot all allocations in the order they were made.
    #[must_use]
    pub fn build_device_map(&self) -> DeviceMap {
        DeviceMap {
            allocations: self.allocations.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sequential_allocation() {
        let mut alloc = DeviceAllocator::new();
        let a = alloc.allocate_input("PB1", "start").unwrap();
        let b = alloc.allocate_input("PB2", "stop").unwrap();
        assert_eq!(a.address.to_string(), "X0");
        assert_eq!(b.address.to_string(), "X1");
    }

    #[test]
    fn test_octal_rollover() {
        let mut alloc = DeviceAllocator::new();
        for i in 0..8 {
            alloc.allocate_output(&format!("OUT{i}"), "").unwrap();
        }
        let ninth = alloc.allocate_output("OUT8", "").unwrap();
        assert_eq!(ninth.address.to_string(), "Y10");
    }

    #[test]
    fn test_same_name_returns_original() {
        let mut alloc = DeviceAllocator::new();
        let first = alloc.allocate_relay("M_HOLD", "hold").unwrap();
        let again = alloc.allocate_relay("M_HOLD", "other comment").unwrap();
        assert_eq!(first, again);
        assert_eq!(alloc.cursor(DeviceType::M), 1);
        assert_eq!(alloc.build_device_map().len(), 1);
    }

    #[test]
    fn test_preferred_address_skips_taken() {
        let mut alloc = DeviceAllocator::new();
        alloc.allocate_relay("A", "").unwrap();
        let b = alloc
            .allocate("B", DeviceType::M, "", None, Some(0))
            .unwrap();
        assert_eq!(b.address.address, 1);
    }

    #[test]
    fn test_preferred_address_out_of_range() {
        let mut alloc = DeviceAllocator::new();
        let err = alloc
            .allocate("FAR", DeviceType::X, "", None, Some(32))
            .unwrap_err();
        assert!(matches!(err, LadderError::DeviceRange { .. }));
    }

    #[test]
    fn test_capacity_exhausted() {
        let mut alloc = DeviceAllocator::new();
        for i in 0..32 {
            alloc.allocate_input(&format!("IN{i}"), "").unwrap();
        }
        let err = alloc.allocate_input("IN32", "").unwrap_err();
        assert!(matches!(err, LadderError::DeviceRange { .. }));
    }

    #[test]
    fn test_timer_k_value() {
        let mut alloc = DeviceAllocator::new();
        let t = alloc.allocate_timer("T_GL", 5.0, "5s").unwrap();
        assert_eq!(t.address.to_string(), "T0");
        assert_eq!(t.k_value(), Some(50));
    }

    #[test]
    fn test_counter_preset_recorded() {
        let mut alloc = DeviceAllocator::new();
        let c = alloc.allocate_counter("C_PARTS", 10, "parts").unwrap();
        assert_eq!(c.k_value(), Some(10));
        let map = alloc.build_device_map();
        assert_eq!(map.get_by_name("C_PARTS").and_then(|a| a.k_value()), Some(10));
        assert!(alloc.allocate_counter("C_ZERO", 0, "").is_err());
    }

    #[test]
    fn test_reserve() {
        let mut alloc = DeviceAllocator::new();
        let m0 = DeviceAddress::new(DeviceType::M, 0);
        alloc.reserve(m0).unwrap();
        assert!(matches!(
            alloc.reserve(m0),
            Err(LadderError::DeviceConflict { .. })
        ));
        assert!(matches!(
            alloc.reserve(DeviceAddress::new(DeviceType::Y, 40)),
            Err(LadderError::DeviceRange { .. })
        ));
        let relay = alloc.allocate_relay("M_HOLD", "").unwrap();
        assert_eq!(relay.address.to_string(), "M1");
    }

    #[test]
    fn test_with_config() {
        let config = DeviceConfig {
            limits: DeviceLimits {
                t: 2,
                ..DeviceLimits::default()
            },
            start: vec![DeviceAddress::new(DeviceType::X, 8)],
            reserved: vec![DeviceAddress::new(DeviceType::X, 9)],
        };
        let mut alloc = DeviceAllocator::with_config(&config).unwrap();
        assert_eq!(alloc.allocate_input("A", "").unwrap().address.to_string(), "X10");
        assert_eq!(alloc.allocate_input("B", "").unwrap().address.to_string(), "X12");
        alloc.allocate_timer("T1", 1.0, "").unwrap();
        alloc.allocate_timer("T2", 1.0, "").unwrap();
        assert!(alloc.allocate_timer("T3", 1.0, "").is_err());
    }

    #[test]
    fn test_with_config_conflicting_reservations() {
        let m5 = DeviceAddress::new(DeviceType::M, 5);
        let config = DeviceConfig {
            reserved: vec![m5, m5],
            ..DeviceConfig::default()
        };
        assert!(DeviceAllocator::with_config(&config).is_err());
    }

    fn any_device_type() -> impl Strategy<Value = DeviceType> {
        prop::sample::select(DeviceType::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_reallocation_is_stable(
            device_type in any_device_type(),
            names in prop::collection::vec("[A-Z]{1,4}", 1..20),
        ) {
            let mut alloc = DeviceAllocator::new();
            for name in &names {
                let first = alloc.allocate(name, device_type, "", None, None).unwrap();
                let cursor = alloc.cursor(device_type);
                let second = alloc.allocate(name, device_type, "", None, None).unwrap();
                prop_assert_eq!(first.address, second.address);
                prop_assert_eq!(cursor, alloc.cursor(device_type));
            }
        }

        #[test]
        fn prop_addresses_unique_until_capacity(device_type in any_device_type()) {
            let mut alloc = DeviceAllocator::new();
            let limit = DeviceLimits::default().limit(device_type);
            let mut seen = BTreeSet::new();
            for i in 0..limit {
                let a = alloc.allocate(&format!("N{i}"), device_type, "", None, None).unwrap();
                prop_assert!(seen.insert(a.address));
            }
            let overflow = alloc.allocate("OVERFLOW", device_type, "", None, None);
            prop_assert!(
                matches!(overflow, Err(LadderError::DeviceRange { .. })),
                "expected range error past capacity"
            );
        }
    }
}
