// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::fail::Fail;
use ::std::{
    fs,
    ops::Index,
    str::FromStr,
    time::Duration,
};
use ::yaml_rust::{
    Yaml,
    YamlLoader,
};

//======================================================================================================================
// Constants
//======================================================================================================================

// Schedule manager options.
mod manager_config {
    pub const SECTION_NAME: &str = "schedule_manager";
    // Time between two ticks of the host loop.
    pub const TICK_INTERVAL_MS: &str = "tick_interval_ms";
    // Upper bound on the number of ticks of the host loop.
    pub const MAX_TICKS: &str = "max_ticks";
    // Ticks given to canceled schedules on shutdown.
    pub const SHUTDOWN_TICKS: &str = "shutdown_ticks";
    // Seed for simulated work durations.
    pub const SEED: &str = "seed";
}

// Schedules to submit on start.
mod schedules_config {
    pub const SECTION_NAME: &str = "schedules";
    pub const NAME: &str = "name";
    pub const ITEMS: &str = "items";
    pub const WORK: &str = "work";
    pub const TICKS: &str = "ticks";
    pub const JITTER: &str = "jitter";
    pub const FAIL_ON_START: &str = "fail_on_start";
    pub const FAIL_ON_TICK: &str = "fail_on_tick";
    pub const STOP_TICKS: &str = "stop_ticks";
}

//======================================================================================================================
// Structures
//======================================================================================================================

/// Schedule manager configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Yaml);

/// Schedule described in the configuration file.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleDescriptor {
    pub name: String,
    pub items: Vec<ItemDescriptor>,
}

/// Schedule item described in the configuration file.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemDescriptor {
    pub name: String,
    pub work: Vec<WorkDescriptor>,
}

/// Simulated work described in the configuration file.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkDescriptor {
    pub name: String,
    pub ticks: usize,
    /// Extra ticks drawn at random from `[0, jitter]`.
    pub jitter: usize,
    pub fail_on_start: bool,
    pub fail_on_tick: Option<usize>,
    pub stop_ticks: usize,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl Config {
    /// Reads a configuration file into a [Config] object.
    pub fn new(config_path: &str) -> Result<Self, Fail> {
        let config_s: String = fs::read_to_string(config_path)?;
        Self::parse(&config_s)
    }

    /// Parses a configuration document.
    pub fn parse(config_s: &str) -> Result<Self, Fail> {
        let config: Vec<Yaml> = match YamlLoader::load_from_str(config_s) {
            Ok(config) => config,
            Err(e) => {
                let cause: String = format!("failed to parse configuration: {}", e);
                error!("parse(): {}", cause);
                return Err(Fail::new(libc::EINVAL, &cause));
            },
        };
        match &config[..] {
            [c] => Ok(Self(c.clone())),
            _ => Err(Fail::new(libc::EINVAL, "Wrong number of config objects")),
        }
    }

    fn get_manager_config(&self) -> Result<&Yaml, Fail> {
        Self::get_subsection(&self.0, manager_config::SECTION_NAME)
    }

    /// Reads the tick interval from the environment variable first and then the configuration file.
    pub fn tick_interval(&self) -> Result<Duration, Fail> {
        let interval: u64 = if let Some(interval) = Self::get_typed_env_option(manager_config::TICK_INTERVAL_MS)? {
            interval
        } else {
            Self::get_int_option(self.get_manager_config()?, manager_config::TICK_INTERVAL_MS)?
        };
        Ok(Duration::from_millis(interval))
    }

    /// Reads the tick limit from the environment variable first and then the configuration file.
    pub fn max_ticks(&self) -> Result<u64, Fail> {
        if let Some(max_ticks) = Self::get_typed_env_option(manager_config::MAX_TICKS)? {
            Ok(max_ticks)
        } else {
            Self::get_int_option(self.get_manager_config()?, manager_config::MAX_TICKS)
        }
    }

    pub fn shutdown_ticks(&self) -> Result<usize, Fail> {
        if let Some(shutdown_ticks) = Self::get_typed_env_option(manager_config::SHUTDOWN_TICKS)? {
            Ok(shutdown_ticks)
        } else {
            Self::get_int_option(self.get_manager_config()?, manager_config::SHUTDOWN_TICKS)
        }
    }

    /// Seed for simulated work durations. Optional.
    pub fn seed(&self) -> Result<Option<u64>, Fail> {
        if let Some(seed) = Self::get_typed_env_option(manager_config::SEED)? {
            return Ok(Some(seed));
        }
        match self.get_manager_config()?.index(manager_config::SEED) {
            Yaml::BadValue => Ok(None),
            _ => Ok(Some(Self::get_int_option(self.get_manager_config()?, manager_config::SEED)?)),
        }
    }

    /// Reads the schedules to submit. A missing section means no schedules.
    pub fn schedules(&self) -> Result<Vec<ScheduleDescriptor>, Fail> {
        let schedules: &Vec<Yaml> = match self.0.index(schedules_config::SECTION_NAME) {
            Yaml::BadValue | Yaml::Null => return Ok(Vec::new()),
            yaml => Self::as_array(yaml, schedules_config::SECTION_NAME)?,
        };

        let mut result: Vec<ScheduleDescriptor> = Vec::with_capacity(schedules.len());
        for schedule in schedules {
            let name: String = Self::get_string_option(schedule, schedules_config::NAME)?;
            let items: &Vec<Yaml> = Self::as_array(
                Self::get_option(schedule, schedules_config::ITEMS)?,
                schedules_config::ITEMS,
            )?;
            let mut item_descriptors: Vec<ItemDescriptor> = Vec::with_capacity(items.len());
            for item in items {
                item_descriptors.push(Self::parse_item(item)?);
            }
            result.push(ScheduleDescriptor {
                name,
                items: item_descriptors,
            });
        }
        Ok(result)
    }

    fn parse_item(item: &Yaml) -> Result<ItemDescriptor, Fail> {
        let name: String = Self::get_string_option(item, schedules_config::NAME)?;
        let work: &Vec<Yaml> = match item.index(schedules_config::WORK) {
            Yaml::BadValue | Yaml::Null => {
                return Ok(ItemDescriptor {
                    name,
                    work: Vec::new(),
                })
            },
            yaml => Self::as_array(yaml, schedules_config::WORK)?,
        };
        let mut work_descriptors: Vec<WorkDescriptor> = Vec::with_capacity(work.len());
        for work_item in work {
            work_descriptors.push(Self::parse_work(work_item)?);
        }
        Ok(ItemDescriptor {
            name,
            work: work_descriptors,
        })
    }

    fn parse_work(work: &Yaml) -> Result<WorkDescriptor, Fail> {
        Ok(WorkDescriptor {
            name: Self::get_string_option(work, schedules_config::NAME)?,
            ticks: Self::get_int_option(work, schedules_config::TICKS)?,
            jitter: Self::get_optional(work, schedules_config::JITTER, Self::get_int_option)?.unwrap_or(0),
            fail_on_start: Self::get_optional(work, schedules_config::FAIL_ON_START, Self::get_bool_option)?
                .unwrap_or(false),
            fail_on_tick: Self::get_optional(work, schedules_config::FAIL_ON_TICK, Self::get_int_option)?,
            stop_ticks: Self::get_optional(work, schedules_config::STOP_TICKS, Self::get_int_option)?.unwrap_or(1),
        })
    }

    //==================================================================================================================
    // Static Functions
    //==================================================================================================================

    /// Similar to `get_typed_option` using `Yaml::as_hash` receiver. This method returns a `&Yaml` instead of
    /// yaml::Hash, and Yaml is more natural for indexing.
    fn get_subsection<'a>(yaml: &'a Yaml, index: &str) -> Result<&'a Yaml, Fail> {
        let section: &'a Yaml = Self::get_option(yaml, index)?;
        match section {
            Yaml::Hash(_) => Ok(section),
            _ => {
                let message: String = format!("parameter \"{}\" has unexpected type", index);
                Err(Fail::new(libc::EINVAL, message.as_str()))
            },
        }
    }

    /// Index `yaml` to find the value at `index`, validating that the index exists.
    fn get_option<'a>(yaml: &'a Yaml, index: &str) -> Result<&'a Yaml, Fail> {
        match yaml.index(index) {
            Yaml::BadValue => {
                let message: String = format!("missing configuration option \"{}\"", index);
                Err(Fail::new(libc::EINVAL, message.as_str()))
            },
            value => Ok(value),
        }
    }

    /// Reads an option that may be absent.
    fn get_optional<T>(
        yaml: &Yaml,
        index: &str,
        getter: fn(&Yaml, &str) -> Result<T, Fail>,
    ) -> Result<Option<T>, Fail> {
        match yaml.index(index) {
            Yaml::BadValue => Ok(None),
            _ => Ok(Some(getter(yaml, index)?)),
        }
    }

    /// Index `yaml` to find the value at `index`, validating that it exists and that the receiver returns Some(_).
    fn get_typed_option<'a, T, Fn>(yaml: &'a Yaml, index: &str, receiver: Fn) -> Result<T, Fail>
    where
        Fn: FnOnce(&'a Yaml) -> Option<T>,
    {
        let option: &'a Yaml = Self::get_option(yaml, index)?;
        match receiver(option) {
            Some(value) => Ok(value),
            None => {
                let message: String = format!("parameter {} has unexpected type", index);
                Err(Fail::new(libc::EINVAL, message.as_str()))
            },
        }
    }

    fn as_array<'a>(yaml: &'a Yaml, index: &str) -> Result<&'a Vec<Yaml>, Fail> {
        match yaml {
            Yaml::Array(array) => Ok(array),
            _ => {
                let message: String = format!("parameter \"{}\" should be a list", index);
                Err(Fail::new(libc::EINVAL, message.as_str()))
            },
        }
    }

    /// Get value where the environment value overrides the config file if it exists.
    fn get_typed_env_option<T: FromStr>(index: &str) -> Result<Option<T>, Fail> {
        // Check for the environment variable.
        if let Ok(var) = ::std::env::var(index.to_uppercase()) {
            if let Ok(value) = var.as_str().parse() {
                return Ok(Some(value));
            } else {
                let message: String = format!("parameter {} has unexpected type", index);
                return Err(Fail::new(libc::EINVAL, message.as_str()));
            }
        }
        Ok(None)
    }

    /// Similar to `get_typed_option` using `Yaml::as_i64` as the receiver, but additionally verifies that the
    /// destination type may hold the i64 value.
    fn get_int_option<T: TryFrom<i64>>(yaml: &Yaml, index: &str) -> Result<T, Fail> {
        let val: i64 = Self::get_typed_option(yaml, index, &Yaml::as_i64)?;
        match T::try_from(val) {
            Ok(val) => Ok(val),
            _ => {
                let message: String = format!("parameter \"{}\" is out of range", index);
                Err(Fail::new(libc::ERANGE, message.as_str()))
            },
        }
    }

    /// Same as `Self::get_typed_option` using `Yaml::as_bool` as the receiver.
    fn get_bool_option(yaml: &Yaml, index: &str) -> Result<bool, Fail> {
        Self::get_typed_option(yaml, index, &Yaml::as_bool)
    }

    fn get_string_option(yaml: &Yaml, index: &str) -> Result<String, Fail> {
        Self::get_typed_option(yaml, index, |value: &Yaml| value.as_str().map(str::to_string))
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
