//! Telemetry message builders converting vehicle snapshots to MAVLink messages.

use mavlink::common::*;

use crate::vehicle::VehicleTelemetry;

/// ArduCopter custom mode number for a flight mode name.
///
/// Unknown names map to Stabilize (0).
pub fn copter_custom_mode(mode: &str) -> u32 {
    match mode {
        "Stabilize" => 0,
        "Acro" => 1,
        "AltHold" | "Altitude Hold" => 2,
        "Auto" => 3,
        "Guided" => 4,
        "Loiter" => 5,
        "RTL" | "Return To Launch" => 6,
        "Land" => 9,
        "PosHold" | "Position Hold" => 16,
        _ => 0,
    }
}

/// Build a HEARTBEAT message for a multicopter.
pub fn build_heartbeat(telemetry: &VehicleTelemetry) -> MavMessage {
    let mut base_mode = MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED
        | MavModeFlag::MAV_MODE_FLAG_GUIDED_ENABLED;
    if telemetry.armed {
        base_mode |= MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED;
    }

    MavMessage::HEARTBEAT(HEARTBEAT_DATA {
        custom_mode: copter_custom_mode(&telemetry.flight_mode),
        mavtype: MavType::MAV_TYPE_QUADROTOR,
        autopilot: MavAutopilot::MAV_AUTOPILOT_ARDUPILOTMEGA,
        base_mode,
        system_status: if telemetry.armed {
            MavState::MAV_STATE_ACTIVE
        } else {
            MavState::MAV_STATE_STANDBY
        },
        mavlink_version: 3,
    })
}

/// Build a GLOBAL_POSITION_INT message (used by the GCS map display).
pub fn build_global_position_int(telemetry: &VehicleTelemetry, time_boot_ms: u32) -> MavMessage {
    let relative_alt_mm = (telemetry.relative_altitude_m * 1000.0) as i32;
    MavMessage::GLOBAL_POSITION_INT(GLOBAL_POSITION_INT_DATA {
        time_boot_ms,
        lat: (telemetry.position.latitude * 1e7) as i32,
        lon: (telemetry.position.longitude * 1e7) as i32,
        alt: relative_alt_mm,
        relative_alt: relative_alt_mm,
        vx: 0,
        vy: 0,
        vz: 0,
        hdg: (telemetry.heading_deg * 100.0) as u16,
    })
}

/// Build a SYS_STATUS message carrying the remaining battery percentage.
pub fn build_sys_status(telemetry: &VehicleTelemetry) -> MavMessage {
    let remaining = telemetry.battery_remaining_percent.clamp(0.0, 100.0).round() as i8;
    MavMessage::SYS_STATUS(SYS_STATUS_DATA {
        voltage_battery: u16::MAX,
        current_battery: -1,
        battery_remaining: remaining,
        ..Default::default()
    })
}
