use std::sync::OnceLock;

use crate::models::{Driver, DriverProtocol, DriverType};

#[allow(clippy::too_many_arguments)]
fn driver(
    id: &str,
    title: &str,
    driver_type: DriverType,
    protocol: DriverProtocol,
    sense_resistor: f64,
    cooling_current_threshold: f64,
    voltages: &[u32],
    max_current: f64,
    external: bool,
) -> Driver {
    Driver {
        id: id.to_string(),
        title: title.to_string(),
        driver_type,
        protocol,
        sense_resistor,
        cooling_current_threshold,
        voltages: voltages.to_vec(),
        max_current,
        external,
    }
}

/// Supported stepper drivers
pub fn drivers() -> &'static [Driver] {
    static DRIVERS: OnceLock<Vec<Driver>> = OnceLock::new();
    DRIVERS.get_or_init(|| {
        use DriverProtocol::{Spi, Uart};
        use DriverType::*;
        vec![
            driver("BTT-TMC2209-13", "BTT TMC2209 v1.3", Tmc2209, Uart, 0.11, 1.1, &[24], 2.0, false),
            driver("BTT-TMC2226-10", "BTT TMC2226 v1.0", Tmc2226, Uart, 0.11, 1.1, &[24], 2.0, false),
            driver("BTT-TMC5160-PRO-11", "BTT TMC5160 Pro v1.1", Tmc5160, Spi, 0.075, 1.5, &[24, 36, 48, 56], 3.0, false),
            driver("BTT-TMC5160T-PLUS-10", "BTT TMC5160T Plus v1.0", Tmc5160, Spi, 0.022, 3.0, &[24, 36, 48, 56, 60], 10.6, true),
            driver("BTT-EZ2209", "BTT EZ2209", Tmc2209, Uart, 0.11, 1.3, &[24], 2.0, false),
            driver("BTT-EZ2226", "BTT EZ2226", Tmc2226, Uart, 0.11, 1.3, &[24], 2.0, false),
            driver("BTT-EZ2130", "BTT EZ2130", Tmc2130, Spi, 0.11, 0.9, &[24], 2.0, false),
            driver("BTT-EZ5160-PRO", "BTT EZ5160 Pro", Tmc5160, Spi, 0.075, 1.6, &[24, 36, 48], 2.5, false),
            driver("BTT-EZ5160-RGB", "BTT EZ5160 RGB", Tmc5160, Spi, 0.05, 3.0, &[24, 48, 36, 56], 4.7, false),
            driver("MELLOW-FLY-HV-TMC5160-PRO-12", "Mellow FLY HV TMC5160 Pro v1.2", Tmc5160, Spi, 0.033, 3.0, &[24, 36, 48], 4.25, true),
            driver("PRUSA-EINSY-RAMBO-TMC2130", "Prusa Einsy Rambo TMC2130", Tmc2130, Spi, 0.22, 0.9, &[24], 2.0, false),
        ]
    })
}

pub fn find_driver(id: &str) -> Option<&'static Driver> {
    drivers().iter().find(|d| d.id == id)
}
