//! LaunchAgent descriptors and the per-label plist store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::error::DaemonError;
use crate::plist::{self, PlistDict, PlistValue};
use crate::schedule::{self, CalendarInterval, DisplaySchedule};

const LABEL: &str = "Label";
const DISABLED: &str = "Disabled";
const PROGRAM: &str = "Program";
const PROGRAM_ARGUMENTS: &str = "ProgramArguments";
const ENVIRONMENT_VARIABLES: &str = "EnvironmentVariables";
const START_CALENDAR_INTERVAL: &str = "StartCalendarInterval";
const RUN_AT_LOAD: &str = "RunAtLoad";
const STANDARD_OUT_PATH: &str = "StandardOutPath";
const STANDARD_ERROR_PATH: &str = "StandardErrorPath";

const MODELED_KEYS: &[&str] = &[
    LABEL,
    DISABLED,
    PROGRAM,
    PROGRAM_ARGUMENTS,
    ENVIRONMENT_VARIABLES,
    START_CALENDAR_INTERVAL,
    RUN_AT_LOAD,
    STANDARD_OUT_PATH,
    STANDARD_ERROR_PATH,
];

/// One LaunchAgent plist.
///
/// Keys that are not modeled here are carried in `extra` and written back in
/// their original order after the modeled ones.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDescriptor {
    pub label: String,
    pub enabled: bool,
    /// `Program`, when the plist names the executable separately.
    pub program: Option<String>,
    /// Executable followed by its arguments.
    pub command: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub schedule: Option<CalendarInterval>,
    pub run_at_load: bool,
    pub stdout_path: Option<PathBuf>,
    pub stderr_path: Option<PathBuf>,
    /// Whether `ProgramArguments` is written even when `Program` alone would do.
    has_arguments: bool,
    extra: PlistDict,
}

impl JobDescriptor {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: true,
            program: None,
            command: Vec::new(),
            environment: BTreeMap::new(),
            schedule: None,
            run_at_load: false,
            stdout_path: None,
            stderr_path: None,
            has_arguments: false,
            extra: PlistDict::new(),
        }
    }

    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self.has_arguments = true;
        self
    }

    pub fn with_schedule(mut self, schedule: CalendarInterval) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Build from a parsed plist. `fallback_label` is used when the plist has no `Label`.
    pub fn from_plist(value: PlistValue, fallback_label: &str) -> Result<Self, String> {
        let dict = value
            .into_dict()
            .ok_or_else(|| "root element is not a dict".to_string())?;

        let label = match dict.get(LABEL) {
            Some(v) => v.as_str().ok_or("Label is not a string")?.to_string(),
            None => fallback_label.to_string(),
        };

        let enabled = !dict.get(DISABLED).and_then(PlistValue::as_bool).unwrap_or(false);

        let program = match dict.get(PROGRAM) {
            Some(v) => Some(v.as_str().ok_or("Program is not a string")?.to_string()),
            None => None,
        };

        let command = match (dict.get(PROGRAM_ARGUMENTS), &program) {
            (Some(args), _) => args
                .as_array()
                .ok_or("ProgramArguments is not an array")?
                .iter()
                .map(|a| a.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or("ProgramArguments contains a non-string")?,
            (None, Some(program)) => vec![program.clone()],
            (None, None) => Vec::new(),
        };

        let environment = match dict.get(ENVIRONMENT_VARIABLES) {
            Some(env) => env
                .as_dict()
                .ok_or("EnvironmentVariables is not a dict")?
                .iter()
                .map(|(k, v)| {
                    let value = match v {
                        PlistValue::String(s) => s.clone(),
                        PlistValue::Integer(i) => i.to_string(),
                        PlistValue::Boolean(b) => b.to_string(),
                        _ => return Err(format!("EnvironmentVariables.{} is not a scalar", k)),
                    };
                    Ok((k.to_string(), value))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()?,
            None => BTreeMap::new(),
        };

        let schedule = dict
            .get(START_CALENDAR_INTERVAL)
            .map(CalendarInterval::from_plist)
            .transpose()
            .map_err(|e| e.to_string())?;

        let path_of = |key: &str| dict.get(key).and_then(PlistValue::as_str).map(PathBuf::from);

        let mut extra = PlistDict::new();
        for (key, value) in dict.iter() {
            if !MODELED_KEYS.contains(&key) {
                extra.insert(key, value.clone());
            }
        }

        Ok(Self {
            label,
            enabled,
            program,
            command,
            environment,
            schedule,
            run_at_load: dict.get(RUN_AT_LOAD).and_then(PlistValue::as_bool).unwrap_or(false),
            stdout_path: path_of(STANDARD_OUT_PATH),
            stderr_path: path_of(STANDARD_ERROR_PATH),
            has_arguments: dict.contains_key(PROGRAM_ARGUMENTS),
            extra,
        })
    }

    pub fn to_plist(&self) -> PlistValue {
        let mut dict = PlistDict::new();
        dict.insert(LABEL, self.label.as_str());
        if !self.enabled {
            dict.insert(DISABLED, true);
        }
        if let Some(program) = &self.program {
            dict.insert(PROGRAM, program.as_str());
        }
        if !self.command.is_empty() && !self.program_only() {
            dict.insert(
                PROGRAM_ARGUMENTS,
                self.command.iter().map(|a| PlistValue::from(a.as_str())).collect::<Vec<_>>(),
            );
        }
        if !self.environment.is_empty() {
            let env: PlistDict = self.environment.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            dict.insert(ENVIRONMENT_VARIABLES, env);
        }
        if let Some(schedule) = &self.schedule {
            dict.insert(START_CALENDAR_INTERVAL, schedule.to_plist());
        }
        if self.run_at_load {
            dict.insert(RUN_AT_LOAD, true);
        }
        if let Some(path) = &self.stdout_path {
            dict.insert(STANDARD_OUT_PATH, path.to_string_lossy().into_owned());
        }
        if let Some(path) = &self.stderr_path {
            dict.insert(STANDARD_ERROR_PATH, path.to_string_lossy().into_owned());
        }
        for (key, value) in self.extra.iter() {
            dict.insert(key, value.clone());
        }
        PlistValue::Dict(dict)
    }

    /// The command line is exactly `Program` and the source had no `ProgramArguments`.
    fn program_only(&self) -> bool {
        !self.has_arguments
            && self
                .program
                .as_ref()
                .is_some_and(|p| self.command.len() == 1 && self.command[0] == *p)
    }

    /// Script handed to the interpreter: the second element of the command line.
    pub fn script_path(&self) -> Option<&str> {
        self.command.get(1).map(String::as_str)
    }

    /// Decoded calendar triggers, empty when the job has no calendar schedule.
    pub fn schedules(&self) -> Vec<DisplaySchedule> {
        self.schedule.as_ref().map(schedule::decode).unwrap_or_default()
    }

    /// Keys preserved verbatim from the source plist.
    pub fn extra(&self) -> &PlistDict {
        &self.extra
    }
}

/// Reject labels that would not name a file directly inside the agents directory.
pub fn validate_label(label: &str) -> Result<(), DaemonError> {
    if label.is_empty()
        || label.contains('/')
        || label.contains('\\')
        || label.contains('\0')
        || label.starts_with('.')
    {
        return Err(DaemonError::InvalidLabel(label.to_string()));
    }
    Ok(())
}

/// Reads and writes `<label>.plist` files in a LaunchAgents directory.
///
/// Mutations for one label are serialized through [`DescriptorStore::update`].
pub struct DescriptorStore {
    dir: PathBuf,
    prefixes: Vec<String>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl DescriptorStore {
    pub fn new(dir: impl Into<PathBuf>, prefixes: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            prefixes,
            locks: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether `label` falls under one of the owned namespace prefixes.
    pub fn owns(&self, label: &str) -> bool {
        self.prefixes.iter().any(|p| label.starts_with(p.as_str()))
    }

    pub fn plist_path(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{}.plist", label))
    }

    fn checked_path(&self, label: &str) -> Result<PathBuf, DaemonError> {
        validate_label(label)?;
        Ok(self.plist_path(label))
    }

    /// Whether `<label>.plist` is present.
    pub async fn exists(&self, label: &str) -> Result<bool, DaemonError> {
        let path = self.checked_path(label)?;
        Ok(fs::try_exists(&path).await?)
    }

    /// Read the descriptor for `label`.
    pub async fn read(&self, label: &str) -> Result<JobDescriptor, DaemonError> {
        let path = self.checked_path(label)?;
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DaemonError::NotFound(label.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let value = plist::parse(&content)?;
        JobDescriptor::from_plist(value, label)
            .map_err(|reason| DaemonError::InvalidDescriptor { path, reason })
    }

    /// Replace the descriptor for `label`.
    ///
    /// The document is written to a sibling temp file and renamed into place,
    /// so readers see either the old or the new file.
    pub async fn write(&self, label: &str, descriptor: &JobDescriptor) -> Result<(), DaemonError> {
        let path = self.checked_path(label)?;
        let tmp = self.dir.join(format!(".{}.plist.tmp", label));
        let content = plist::to_xml(&descriptor.to_plist());

        fs::write(&tmp, content).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!("Wrote LaunchAgent plist: {}", path.display());
        Ok(())
    }

    /// Read-modify-write under the label's lock.
    pub async fn update<F>(&self, label: &str, mutate: F) -> Result<JobDescriptor, DaemonError>
    where
        F: FnOnce(&mut JobDescriptor) -> Result<(), DaemonError>,
    {
        let _guard = self.lock(label).await;
        let mut descriptor = self.read(label).await?;
        mutate(&mut descriptor)?;
        self.write(label, &descriptor).await?;
        info!("Updated LaunchAgent descriptor: {}", label);
        Ok(descriptor)
    }

    /// Exclusive access to one label's descriptor.
    pub async fn lock(&self, label: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(label.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Owned labels present in the directory, sorted.
    pub async fn list_labels(&self) -> Result<Vec<String>, DaemonError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut labels = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(label) = name.to_str().and_then(|n| n.strip_suffix(".plist")) else {
                continue;
            };
            if self.owns(label) {
                labels.push(label.to_string());
            }
        }
        labels.sort();
        Ok(labels)
    }
}
