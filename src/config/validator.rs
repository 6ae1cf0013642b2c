//! Configuration validation

use super::*;
use anyhow::Result;

/// Validate complete configuration
pub fn validate_config(config: &SolverConfig) -> Result<()> {
    if config.time_limit_secs.is_none() {
        anyhow::bail!("time limit is required (--time-limit or time_limit_secs)");
    }
    if config.processes < 2 {
        anyhow::bail!(
            "processes must be at least 2 (one coordinator and one worker), got {}",
            config.processes
        );
    }
    validate_search(&config.search)?;

    Ok(())
}

/// Validate search tunables
pub fn validate_search(search: &SearchConfig) -> Result<()> {
    if search.parallel_saturation_threshold == 0 {
        anyhow::bail!("parallel_saturation_threshold must be at least 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SolverConfig {
        SolverConfig {
            time_limit_secs: Some(10),
            processes: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_validate_group_size() {
        let mut config = valid();
        config.processes = 1;
        assert!(validate_config(&config).is_err());
        config.processes = 2;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_time_limit_present() {
        let mut config = valid();
        config.time_limit_secs = None;
        assert!(validate_config(&config).is_err());
        config.time_limit_secs = Some(0);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_search() {
        let mut config = valid();
        config.search.clique_task_depth = 0;
        assert!(validate_config(&config).is_ok());
        config.search.parallel_saturation_threshold = 0;
        assert!(validate_config(&config).is_err());
    }
}
