//! Configuration validation command

use payara_harness_common::{ContainerConfiguration, ContainerMode, ValidatedConfiguration};

use crate::output::{self, or_dash, OutputFormat, TableDisplay};

impl TableDisplay for ValidatedConfiguration {
    fn headers() -> Vec<&'static str> {
        vec![
            "Mode",
            "Artifact",
            "Version",
            "Edition",
            "Startup timeout",
            "Command options",
            "Extra options",
            "Endpoint",
        ]
    }

    fn row(&self) -> Vec<String> {
        let artifact = match (&self.micro_jar, self.micro_on_classpath) {
            (Some(jar), true) => format!("{} (class path)", jar.display()),
            (Some(jar), false) => jar.display().to_string(),
            (None, _) => "-".to_string(),
        };
        let timeout = match self.startup_timeout {
            Some(d) => format!("{}s", d.as_secs()),
            None => "unbounded".to_string(),
        };
        let endpoint = match self.mode {
            ContainerMode::Micro if self.random_http_port => "random port".to_string(),
            ContainerMode::Micro => "default port".to_string(),
            ContainerMode::Remote => self.remote.admin_url(),
        };

        vec![
            self.mode.to_string(),
            artifact,
            or_dash(self.version.as_ref()),
            or_dash(self.version.as_ref().map(|v| v.edition())),
            timeout,
            or_dash(self.cmd_options.as_ref()),
            or_dash(self.extra_micro_options.as_ref()),
            endpoint,
        ]
    }
}

pub fn execute(config: ContainerConfiguration, format: OutputFormat) -> anyhow::Result<()> {
    let validated = config.validate()?;
    output::print_item(&validated, format);

    if matches!(format, OutputFormat::Table) {
        output::print_success("Configuration is valid");
    }
    Ok(())
}
