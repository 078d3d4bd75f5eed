// MIT License
// Device catalog for a Turris Gadgets installation.

use std::collections::BTreeMap;

/// Hardware type of a wireless unit, as printed on the device label.
///
/// The type selects which event-handling rules apply in
/// [`crate::state::apply_event`]; each variant owns an independent slice
/// of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareType {
    /// RC-86K dual-button keyfob remote
    Rc86K,
    /// JA-81M wall switch
    Ja81M,
    /// JA-83M magnetic door/window contact
    Ja83M,
    /// JA-83P PIR motion detector
    Ja83P,
    /// JA-85ST smoke and heat detector
    Ja85St,
    /// JA-82SH shock/glass-break detector
    Ja82Sh,
    /// JA-80L indoor siren
    Ja80L,
    /// TP-82N wireless thermostat
    Tp82N,
    /// AC-88 switched socket (relay output)
    Ac88,
}

impl HardwareType {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Rc86K => "keyfob remote",
            Self::Ja81M => "wall switch",
            Self::Ja83M => "door contact",
            Self::Ja83P => "motion detector",
            Self::Ja85St => "smoke detector",
            Self::Ja82Sh => "shock detector",
            Self::Ja80L => "siren",
            Self::Tp82N => "thermostat",
            Self::Ac88 => "switched socket",
        }
    }
}

/// Role a device plays in arming decisions.
///
/// Only the left-hand button pair of a keyfob arms and disarms the
/// system; right-hand pairs are free-use. An explicit role replaces
/// matching on device names like `remote1L`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Left-hand keyfob buttons: ARM events control the system
    ArmingLeft,
    /// Right-hand keyfob buttons: free use, no arming action
    ArmingRight,
    /// No arming role
    #[default]
    None,
}

/// One physical sensor/actuator unit and its observed health.
#[derive(Debug, Clone)]
pub struct Device {
    /// 8-digit address, unique key into the registry
    pub address: String,
    /// Human label; empty for unused slots
    pub name: String,
    pub hardware_type: HardwareType,
    pub role: Role,
    /// Sticky until a later message for this device carries LB:0
    pub low_battery: bool,
}

impl Device {
    pub fn new(address: &str, name: &str, hardware_type: HardwareType, role: Role) -> Self {
        Self {
            address: address.to_string(),
            name: name.to_string(),
            hardware_type,
            role,
            low_battery: false,
        }
    }
}

/// Fixed catalog of registered hardware addresses.
///
/// Constructed once at startup; membership never changes during a run.
/// The only runtime mutation is the per-device low-battery flag.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    devices: BTreeMap<String, Device>,
}

impl DeviceRegistry {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            devices: devices
                .into_iter()
                .map(|d| (d.address.clone(), d))
                .collect(),
        }
    }

    /// The reference installation: 15 units on addresses
    /// 00000001-00000015.
    pub fn reference_installation() -> Self {
        use HardwareType::*;
        Self::new(vec![
            Device::new("00000001", "remote1L", Rc86K, Role::ArmingLeft),
            Device::new("00000002", "remote1R", Rc86K, Role::ArmingRight),
            Device::new("00000003", "remote2L", Rc86K, Role::ArmingLeft),
            Device::new("00000004", "remote2R", Rc86K, Role::ArmingRight),
            Device::new("00000005", "", Ja81M, Role::None),
            Device::new("00000006", "door1", Ja83M, Role::None),
            Device::new("00000007", "door2", Ja83M, Role::None),
            Device::new("00000008", "pir1", Ja83P, Role::None),
            Device::new("00000009", "pir2", Ja83P, Role::None),
            Device::new("00000010", "smokedetector", Ja85St, Role::None),
            Device::new("00000011", "", Ja82Sh, Role::None),
            Device::new("00000012", "siren", Ja80L, Role::None),
            Device::new("00000013", "thermostat", Tp82N, Role::None),
            Device::new("00000014", "socket1", Ac88, Role::None), // PGX
            Device::new("00000015", "socket2", Ac88, Role::None), // PGY
        ])
    }

    /// Look up a device by its 8-digit address.
    pub fn lookup(&self, address: &str) -> Option<&Device> {
        self.devices.get(address)
    }

    /// Set the low-battery flag from a decoded LB field.
    ///
    /// Called for every message carrying LB:, independent of message
    /// type. Absent the field the flag keeps its previous value.
    pub fn apply_battery_flag(&mut self, address: &str, flag: bool) {
        if let Some(dev) = self.devices.get_mut(address) {
            dev.low_battery = flag;
        }
    }

    /// All registered devices in address order.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// Devices currently flagged low-battery, for the end-of-cycle sweep.
    pub fn low_battery_devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values().filter(|d| d.low_battery)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_all_reference_addresses() {
        let reg = DeviceRegistry::reference_installation();
        assert_eq!(reg.len(), 15);
        for i in 1..=15 {
            let addr = format!("{:08}", i);
            let dev = reg.lookup(&addr).expect("registered address");
            assert_eq!(dev.address, addr);
        }
    }

    #[test]
    fn test_lookup_unknown_address() {
        let reg = DeviceRegistry::reference_installation();
        assert!(reg.lookup("00000099").is_none());
        assert!(reg.lookup("1").is_none());
        assert!(reg.lookup("").is_none());
    }

    #[test]
    fn test_arming_roles() {
        let reg = DeviceRegistry::reference_installation();
        assert_eq!(reg.lookup("00000001").unwrap().role, Role::ArmingLeft);
        assert_eq!(reg.lookup("00000002").unwrap().role, Role::ArmingRight);
        assert_eq!(reg.lookup("00000003").unwrap().role, Role::ArmingLeft);
        assert_eq!(reg.lookup("00000006").unwrap().role, Role::None);
    }

    #[test]
    fn test_battery_flag_sticky() {
        let mut reg = DeviceRegistry::reference_installation();
        reg.apply_battery_flag("00000008", true);
        assert!(reg.lookup("00000008").unwrap().low_battery);

        // Unrelated devices stay clear; the flag persists until LB:0
        assert!(!reg.lookup("00000009").unwrap().low_battery);
        reg.apply_battery_flag("00000008", true);
        assert!(reg.lookup("00000008").unwrap().low_battery);
        reg.apply_battery_flag("00000008", false);
        assert!(!reg.lookup("00000008").unwrap().low_battery);
    }

    #[test]
    fn test_low_battery_sweep() {
        let mut reg = DeviceRegistry::reference_installation();
        reg.apply_battery_flag("00000006", true);
        reg.apply_battery_flag("00000013", true);
        let flagged: Vec<&str> = reg
            .low_battery_devices()
            .map(|d| d.address.as_str())
            .collect();
        assert_eq!(flagged, vec!["00000006", "00000013"]);
    }
}
