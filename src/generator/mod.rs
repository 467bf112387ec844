//! Klipper configuration rendering
//!
//! Each printer family has a primary template, rewritten on every apply, and
//! a base template written once as the user's `printer.cfg`. Both are Tera
//! templates bound to the fragments of a [`ConfigHelper`]. Auxiliary files
//! follow in registration order when the configuration needs them.

pub mod families;
pub mod helper;

#[cfg(test)]
pub(crate) mod test_support;

use serde::Serialize;
use tera::{Context, Tera};
use tracing::{debug, instrument};

use crate::config::ArtifactStore;
use crate::models::{Artifact, BuildSize, PrinterConfiguration};
use crate::{ConfigResult, ConfiguratorError};

pub use families::{families, AxisMargin, StepperLimits, TemplateFamily, UserStepperSpec};
pub use helper::{
    ConfigHelper, HomingAxis, KlipperConfigHelper, SensorlessAxis, MACRO_VARIABLES_SECTION,
};

/// Rewritten on every apply
pub const PRIMARY_FILE: &str = "configurator.cfg";
/// Written once, then owned by the user
pub const BASE_FILE: &str = "printer.cfg";
/// Present in a base file that includes the generated configuration
pub const INCLUDE_MARKER: &str = "[include configurator.cfg]";
/// Present in the placeholder base file shipped before the first apply
pub const FIRST_RUN_MARKER: &str = "[include configurator/initial-setup.cfg]";
/// Requests overwriting every auxiliary file
pub const OVERWRITE_ALL: &str = "*";

/// Whether a base file on disk has left its first-run state
pub fn is_base_initialized(content: &str) -> bool {
    content.contains(INCLUDE_MARKER) && !content.contains(FIRST_RUN_MARKER)
}

/// Registry of the embedded templates
pub struct TemplateRegistry {
    tera: Tera,
}

impl TemplateRegistry {
    pub fn new() -> ConfigResult<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        tera.add_raw_template(
            "caramba-idex/configurator.cfg",
            include_str!("templates/caramba-idex.cfg.tera"),
        )?;
        tera.add_raw_template(
            "caramba-idex/printer.cfg",
            include_str!("templates/caramba-idex-printer.cfg.tera"),
        )?;
        tera.add_raw_template(
            "v-core/configurator.cfg",
            include_str!("templates/v-core.cfg.tera"),
        )?;
        tera.add_raw_template(
            "v-core/printer.cfg",
            include_str!("templates/v-core-printer.cfg.tera"),
        )?;
        tera.add_raw_template(
            HomingAxis::X.file_name(),
            include_str!("templates/sensorless-x.cfg.tera"),
        )?;
        tera.add_raw_template(
            HomingAxis::Y.file_name(),
            include_str!("templates/sensorless-y.cfg.tera"),
        )?;

        Ok(Self { tera })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    pub fn render(&self, template_name: &str, context: &Context) -> ConfigResult<String> {
        if !self.has_template(template_name) {
            return Err(ConfiguratorError::TemplateNotFound(template_name.to_string()));
        }
        debug!("Rendering template: {}", template_name);
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Fragments exposed to templates as `helper.*`
#[derive(Debug, Serialize)]
struct HelperFragments {
    boards: String,
    base: String,
    extruders: String,
    hotends: String,
    input_shaper: String,
    motor_sections: String,
    speed_limits: String,
    macro_travel_speed: u32,
    probe_includes: String,
    probe_pin_section: String,
    endstop_section: String,
    fans: String,
    macros: String,
    macro_variable_overrides: String,
    user_macro_variable_overrides: String,
    save_variables: String,
    user_stepper_sections: String,
    reminders: String,
}

impl HelperFragments {
    fn collect(helper: &dyn ConfigHelper, family: &TemplateFamily, size: BuildSize) -> Self {
        Self {
            boards: helper.render_boards(),
            base: helper.render_base(),
            extruders: helper.render_extruders(),
            hotends: helper.render_hotends(),
            input_shaper: helper.render_input_shaper(),
            motor_sections: helper.render_motor_sections(),
            speed_limits: helper.render_speed_limits(),
            macro_travel_speed: helper.macro_travel_speed(),
            probe_includes: helper.render_probe_includes(),
            probe_pin_section: helper.render_probe_pin_section(),
            endstop_section: helper.render_endstop_section(),
            fans: helper.render_fans(),
            macros: helper.render_macros(),
            macro_variable_overrides: helper.render_macro_variable_overrides(),
            user_macro_variable_overrides: helper
                .render_user_macro_variable_overrides(family.user_macro_variables),
            save_variables: helper.render_save_variables(&family.save_variables(size)),
            user_stepper_sections: helper
                .render_user_stepper_sections(family.user_steppers(), family.margin),
            reminders: helper.render_reminders(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SensorlessFragments {
    x: Vec<SensorlessAxis>,
    y: Vec<SensorlessAxis>,
}

/// A rendered file before it is checked against the disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub file_name: String,
    pub content: String,
}

/// Renders printer configurations into artifacts
pub struct Generator {
    registry: TemplateRegistry,
    families: Vec<TemplateFamily>,
}

impl Generator {
    pub fn new() -> ConfigResult<Self> {
        Ok(Self {
            registry: TemplateRegistry::new()?,
            families: families(),
        })
    }

    pub fn family(&self, template_family: &str) -> ConfigResult<&TemplateFamily> {
        self.families
            .iter()
            .find(|f| f.id == template_family)
            .ok_or_else(|| ConfiguratorError::TemplateNotFound(template_family.to_string()))
    }

    /// Renders file contents: primary first, base second, then auxiliary files
    #[instrument(skip_all, fields(printer = %config.printer.id))]
    pub fn render_files(&self, config: &PrinterConfiguration) -> ConfigResult<Vec<RenderedFile>> {
        let family = self.family(config.printer.template_family())?;
        let helper = KlipperConfigHelper::new(config)?;

        let sensorless = SensorlessFragments {
            x: helper.sensorless_axes(HomingAxis::X)?,
            y: helper.sensorless_axes(HomingAxis::Y)?,
        };
        let auxiliary: Vec<HomingAxis> = HomingAxis::ALL
            .into_iter()
            .filter(|axis| match axis {
                HomingAxis::X => !sensorless.x.is_empty(),
                HomingAxis::Y => !sensorless.y.is_empty(),
            })
            .collect();
        let auxiliary_files: Vec<&str> = auxiliary.iter().map(|a| a.file_name()).collect();

        let mut context = Context::new();
        context.insert("printer", &config.printer);
        context.insert("size", &config.size);
        context.insert("family", family.id);
        context.insert(
            "helper",
            &HelperFragments::collect(&helper, family, config.size),
        );
        context.insert("sensorless", &sensorless);
        context.insert("auxiliary_files", &auxiliary_files);
        context.insert("macro_variables_section", MACRO_VARIABLES_SECTION);

        let mut files = vec![
            RenderedFile {
                file_name: PRIMARY_FILE.to_string(),
                content: self.registry.render(family.primary_template, &context)?,
            },
            RenderedFile {
                file_name: BASE_FILE.to_string(),
                content: self.registry.render(family.initial_template, &context)?,
            },
        ];
        for name in auxiliary_files {
            files.push(RenderedFile {
                file_name: name.to_string(),
                content: self.registry.render(name, &context)?,
            });
        }

        debug!("Rendered {} files", files.len());
        Ok(files)
    }

    /// Renders artifacts with their overwrite policy and on-disk state
    pub async fn render(
        &self,
        config: &PrinterConfiguration,
        store: &ArtifactStore,
        overwrite_files: &[String],
    ) -> ConfigResult<Vec<Artifact>> {
        let files = self.render_files(config)?;

        let mut artifacts = Vec::with_capacity(files.len());
        for file in files {
            let exists = store.exists(&file.file_name).await?;
            let overwrite = match file.file_name.as_str() {
                PRIMARY_FILE => true,
                BASE_FILE => match store.read(BASE_FILE).await? {
                    Some(content) => !is_base_initialized(&content),
                    None => true,
                },
                name => overwrite_files
                    .iter()
                    .any(|f| f == name || f == OVERWRITE_ALL),
            };
            artifacts.push(Artifact {
                file_name: file.file_name,
                content: file.content,
                overwrite,
                exists,
            });
        }
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersistenceConfig;
    use crate::models::EndstopKind;
    use test_support::{caramba_configuration, sample_configuration};

    fn store(dir: &std::path::Path) -> ArtifactStore {
        ArtifactStore::new(PersistenceConfig {
            config_dir: dir.to_path_buf(),
            snapshot_path: dir.join("snapshot.json"),
            max_backups: 5,
        })
    }

    #[test]
    fn test_base_initialized_markers() {
        assert!(is_base_initialized("[include configurator.cfg]\n"));
        assert!(!is_base_initialized(
            "[include configurator.cfg]\n[include configurator/initial-setup.cfg]\n"
        ));
        assert!(!is_base_initialized("[printer]\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let generator = Generator::new().unwrap();
        let config = sample_configuration();
        let first = generator.render_files(&config).unwrap();
        let second = generator.render_files(&config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].file_name, PRIMARY_FILE);
        assert_eq!(first[1].file_name, BASE_FILE);
        assert_eq!(first.len(), 2);
        assert!(first[0].content.contains("[stepper_x]"));
        assert!(first[1].content.contains(INCLUDE_MARKER));
    }

    #[test]
    fn test_sensorless_files_follow_registration_order() {
        let generator = Generator::new().unwrap();
        let mut config = sample_configuration();
        config.toolheads[0].x_endstop = EndstopKind::Sensorless;
        config.toolheads[0].y_endstop = EndstopKind::Sensorless;

        let files = generator.render_files(&config).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![PRIMARY_FILE, BASE_FILE, "sensorless-x.cfg", "sensorless-y.cfg"]
        );
        assert!(files[0].content.contains("[include sensorless-x.cfg]"));
        assert!(files[2].content.contains("driver_SGTHRS: 80"));
        assert!(files[2].content.contains("variable_sensorless_x_current: 0.3"));
    }

    #[test]
    fn test_unknown_family() {
        let generator = Generator::new().unwrap();
        let mut config = sample_configuration();
        config.printer.template = "hyperion-printer.template.cfg".to_string();
        assert!(matches!(
            generator.render_files(&config),
            Err(ConfiguratorError::TemplateNotFound(name)) if name == "hyperion"
        ));
    }

    #[test]
    fn test_caramba_renders_idex_sections() {
        let generator = Generator::new().unwrap();
        let config = caramba_configuration();
        let files = generator.render_files(&config).unwrap();
        assert!(files[0].content.contains("[dual_carriage]"));
        assert!(files[0].content.contains("[fan_generic t1_part_fan]"));
        assert!(files[1].content.contains("variable_xcontrolpoint: 163"));
        assert!(files[1].content.contains("safe_distance: 60"));
    }

    #[tokio::test]
    async fn test_overwrite_policy() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let generator = Generator::new().unwrap();
        let mut config = sample_configuration();
        config.toolheads[0].x_endstop = EndstopKind::Sensorless;

        let artifacts = generator.render(&config, &store, &[]).await.unwrap();
        assert!(artifacts.iter().all(|a| !a.exists));
        assert!(artifacts[0].overwrite);
        assert!(artifacts[1].overwrite);
        assert!(!artifacts[2].overwrite);

        std::fs::write(dir.path().join(BASE_FILE), "[include configurator.cfg]\n").unwrap();
        let artifacts = generator
            .render(&config, &store, &["*".to_string()])
            .await
            .unwrap();
        assert!(artifacts[1].exists);
        assert!(!artifacts[1].overwrite);
        assert!(artifacts[2].overwrite);

        std::fs::write(dir.path().join(BASE_FILE), FIRST_RUN_MARKER).unwrap();
        let artifacts = generator.render(&config, &store, &[]).await.unwrap();
        assert!(artifacts[1].overwrite);
    }
}
