//! Printer template families and their per-family rendering data

use crate::models::{BuildSize, PrinterAxis};

/// Extra travel beyond the bed on the low and high end of an axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisMargin {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepperLimits {
    pub min: i64,
    pub max: i64,
    pub endstop: Option<i64>,
}

pub type LimitsFn = fn(BuildSize, AxisMargin) -> StepperLimits;

/// User-editable stepper section written once into the base file
#[derive(Debug, Clone)]
pub struct UserStepperSpec {
    pub axis: PrinterAxis,
    pub direction_inverted: bool,
    pub rotation_distance: Option<f64>,
    pub rotation_comment: Option<&'static str>,
    pub limits: Option<LimitsFn>,
    pub additional_lines: &'static [&'static str],
}

impl UserStepperSpec {
    fn new(axis: PrinterAxis, direction_inverted: bool) -> Self {
        Self {
            axis,
            direction_inverted,
            rotation_distance: None,
            rotation_comment: None,
            limits: None,
            additional_lines: &[],
        }
    }

    fn rotation(mut self, distance: f64, comment: &'static str) -> Self {
        self.rotation_distance = Some(distance);
        self.rotation_comment = Some(comment);
        self
    }

    fn limits(mut self, limits: LimitsFn) -> Self {
        self.limits = Some(limits);
        self
    }

    fn lines(mut self, lines: &'static [&'static str]) -> Self {
        self.additional_lines = lines;
        self
    }
}

pub type SaveVariablesFn = fn(BuildSize) -> Vec<(&'static str, i64)>;

/// One printer family: its templates and the data they are rendered with
#[derive(Debug, Clone)]
pub struct TemplateFamily {
    pub id: &'static str,
    pub primary_template: &'static str,
    pub initial_template: &'static str,
    pub margin: AxisMargin,
    pub steppers: Vec<UserStepperSpec>,
    pub save_variables: Option<SaveVariablesFn>,
    pub user_macro_variables: &'static [&'static str],
}

impl TemplateFamily {
    pub fn user_steppers(&self) -> &[UserStepperSpec] {
        &self.steppers
    }

    pub fn save_variables(&self, size: BuildSize) -> Vec<(&'static str, i64)> {
        self.save_variables.map(|f| f(size)).unwrap_or_default()
    }
}

const PULLEY_COMMENT: &str = "40 for 20 tooth 2GT pulleys, 32 for 16 tooth 2GT pulleys";
const LEADSCREW_COMMENT: &str = "4 for TR8*4 lead screws";
const EXTRUDER_PID: &[&str] = &[
    "#pressure_advance: 0.05 # https://www.klipper3d.org/Pressure_Advance.html",
    "control: pid",
    "pid_kp: 28.413",
    "pid_ki: 1.334",
    "pid_kd: 151.300",
];

fn caramba_idex() -> TemplateFamily {
    use PrinterAxis::*;
    TemplateFamily {
        id: "caramba-idex",
        primary_template: "caramba-idex/configurator.cfg",
        initial_template: "caramba-idex/printer.cfg",
        margin: AxisMargin { min: 5, max: 5 },
        steppers: vec![
            UserStepperSpec::new(X, false)
                .rotation(40.0, PULLEY_COMMENT)
                .limits(|size, margin| StepperLimits {
                    min: -margin.min,
                    max: size.x as i64,
                    endstop: Some(-margin.min),
                }),
            UserStepperSpec::new(DualCarriage, false)
                .rotation(40.0, PULLEY_COMMENT)
                .limits(|size, margin| StepperLimits {
                    min: 0,
                    max: size.x as i64 + margin.max,
                    endstop: Some(size.x as i64 + margin.max),
                })
                .lines(&["safe_distance: 60"]),
            UserStepperSpec::new(Y, true)
                .rotation(40.0, PULLEY_COMMENT)
                .limits(|size, margin| StepperLimits {
                    min: -margin.min,
                    max: size.y as i64 + margin.max,
                    endstop: Some(-margin.min),
                }),
            UserStepperSpec::new(Y1, false).rotation(40.0, PULLEY_COMMENT),
            UserStepperSpec::new(Z, true)
                .rotation(4.0, LEADSCREW_COMMENT)
                .limits(|size, _| StepperLimits {
                    min: 0,
                    max: size.z as i64,
                    endstop: None,
                }),
            UserStepperSpec::new(Z1, true).rotation(4.0, LEADSCREW_COMMENT),
            UserStepperSpec::new(Z2, true).rotation(4.0, LEADSCREW_COMMENT),
            UserStepperSpec::new(Extruder, true).lines(EXTRUDER_PID),
            UserStepperSpec::new(Extruder1, true).lines(EXTRUDER_PID),
        ],
        save_variables: Some(|size| {
            vec![
                ("xcontrolpoint", size.x as i64 / 2 - 37),
                ("ycontrolpoint", size.y as i64 + 32),
                ("zcontrolpoint", 10),
                ("zoffsetcontrolpoint", 0),
            ]
        }),
        user_macro_variables: &[
            "variable_start_print_park_in: \"back\"",
            "variable_end_print_park_in: \"back\"",
            "variable_pause_print_park_in: \"back\"",
        ],
    }
}

fn v_core() -> TemplateFamily {
    use PrinterAxis::*;
    TemplateFamily {
        id: "v-core",
        primary_template: "v-core/configurator.cfg",
        initial_template: "v-core/printer.cfg",
        margin: AxisMargin { min: 0, max: 0 },
        steppers: vec![
            UserStepperSpec::new(X, false)
                .rotation(40.0, PULLEY_COMMENT)
                .limits(|size, margin| StepperLimits {
                    min: -margin.min,
                    max: size.x as i64 + margin.max,
                    endstop: Some(size.x as i64 + margin.max),
                }),
            UserStepperSpec::new(Y, false)
                .rotation(40.0, PULLEY_COMMENT)
                .limits(|size, margin| StepperLimits {
                    min: -margin.min,
                    max: size.y as i64 + margin.max,
                    endstop: Some(size.y as i64 + margin.max),
                }),
            UserStepperSpec::new(Z, false)
                .rotation(4.0, LEADSCREW_COMMENT)
                .limits(|size, _| StepperLimits {
                    min: 0,
                    max: size.z as i64,
                    endstop: None,
                }),
            UserStepperSpec::new(Z1, false).rotation(4.0, LEADSCREW_COMMENT),
            UserStepperSpec::new(Z2, false).rotation(4.0, LEADSCREW_COMMENT),
            UserStepperSpec::new(Extruder, false).lines(EXTRUDER_PID),
        ],
        save_variables: None,
        user_macro_variables: &["variable_start_print_park_in: \"front\""],
    }
}

/// All families, looked up by the printer definition's template family
pub fn families() -> Vec<TemplateFamily> {
    vec![caramba_idex(), v_core()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caramba_limits() {
        let family = caramba_idex();
        let size = BuildSize::cube(400);
        let dual_carriage = family
            .user_steppers()
            .iter()
            .find(|s| s.axis == PrinterAxis::DualCarriage)
            .unwrap();
        let limits = (dual_carriage.limits.unwrap())(size, family.margin);
        assert_eq!(limits.max, 405);
        assert_eq!(limits.endstop, Some(405));

        let vars = family.save_variables(size);
        assert_eq!(vars[0], ("xcontrolpoint", 163));
        assert_eq!(vars[1], ("ycontrolpoint", 432));
    }

    #[test]
    fn test_family_ids_unique() {
        let families = families();
        assert_eq!(families.len(), 2);
        assert_ne!(families[0].id, families[1].id);
        assert!(v_core().save_variables(BuildSize::cube(300)).is_empty());
    }
}
