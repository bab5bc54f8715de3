use std::path::PathBuf;

/// Runtime configuration for [`crate::init_with_config`].
///
/// Defaults reproduce the reference implementation's hardcoded paths and capacity exactly,
/// so existing drivers built against `init()` see no behavior change. Tests override
/// `socket_path`/`runtime_dir` to run hermetically instead of colliding on `/tmp`.
#[derive(Builder, Clone, Debug)]
#[builder(name = "InterfaceConfigurator", build_fn(validate = "Self::validate"))]
pub struct InterfaceConfig {
    /// Unix socket the transport connects to for every trapped access.
    #[builder(default = "PathBuf::from(\"/tmp/driver_simulator_socket\")")]
    pub socket_path: PathBuf,

    /// Directory holding the driver PID file and interrupt rendezvous files.
    #[builder(default = "PathBuf::from(\"/tmp\")")]
    pub runtime_dir: PathBuf,

    /// Maximum number of simultaneously registered device regions (`REGION_CAP`).
    #[builder(default = "16")]
    pub region_capacity: usize,
}

impl InterfaceConfigurator {
    fn validate(&self) -> Result<(), String> {
        if let Some(cap) = self.region_capacity {
            if cap == 0 {
                return Err("region_capacity must be at least 1".to_string());
            }
        }
        Ok(())
    }
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        InterfaceConfigurator::default()
            .build()
            .expect("default configuration must build")
    }
}

impl InterfaceConfig {
    /// Path of the PID file written by [`crate::init_with_config`], e.g.
    /// `/tmp/interface_driver_1234`.
    pub fn driver_pid_file(&self, pid: u32) -> PathBuf {
        self.runtime_dir.join(format!("interface_driver_{pid}"))
    }

    /// Path of the interrupt rendezvous file for a given driver pid, e.g.
    /// `/tmp/interrupt_info_1234`.
    pub fn interrupt_rendezvous_file(&self, pid: u32) -> PathBuf {
        self.runtime_dir.join(format!("interrupt_info_{pid}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_paths() {
        let config = InterfaceConfig::default();
        assert_eq!(config.socket_path, PathBuf::from("/tmp/driver_simulator_socket"));
        assert_eq!(config.region_capacity, 16);
        assert_eq!(
            config.driver_pid_file(42),
            PathBuf::from("/tmp/interface_driver_42")
        );
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = InterfaceConfigurator::default()
            .region_capacity(0)
            .build();
        assert!(err.is_err());
    }
}
