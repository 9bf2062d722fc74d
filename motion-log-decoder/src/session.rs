//! Replay session
//!
//! The session ties the main log, the index log, and the reconstructors
//! together. It is the entry point for all decoding operations.

use crate::config::SessionConfig;
use crate::dispatcher::TopicDispatcher;
use crate::formats::FrameReader;
use crate::index::IndexController;
use crate::signals::{DatasetCategory, Reconstructor, CATEGORIES};
use crate::types::{DatasetDescriptor, DecoderError, Result, StatusSnapshot};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

/// Suffix of the main message log
pub const MAIN_LOG_SUFFIX: &str = ".json.gz";
/// Suffix of the snapshot index log
pub const INDEX_LOG_SUFFIX: &str = ".index.gz";

/// A replay session over one pair of log files
pub struct Session<R: Read + Seek = File> {
    dispatcher: TopicDispatcher<R>,
    index: IndexController<R>,
    config: SessionConfig,
    reconstructors: HashMap<String, Reconstructor>,
    initial_start_time: f64,
    start_time: f64,
    initial_status: StatusSnapshot,
    status: StatusSnapshot,
}

impl Session<File> {
    /// Open `<prefix>.json.gz` and `<prefix>.index.gz`
    ///
    /// # Example
    /// ```no_run
    /// use motion_log_decoder::Session;
    /// use std::path::Path;
    ///
    /// let mut session = Session::open(Path::new("/tmp/data")).unwrap();
    /// session.initialize().unwrap();
    /// let velocity = session.select_dataset("trapq:toolhead:velocity").unwrap();
    /// let start = session.start_time();
    /// println!("{}", session.pull(&velocity, start + 1.0).unwrap());
    /// ```
    pub fn open(prefix: &Path) -> Result<Self> {
        Self::open_with_config(prefix, SessionConfig::default())
    }

    pub fn open_with_config(prefix: &Path, config: SessionConfig) -> Result<Self> {
        let main_path = with_suffix(prefix, MAIN_LOG_SUFFIX);
        let index_path = with_suffix(prefix, INDEX_LOG_SUFFIX);
        log::info!("Opening log {:?}", main_path);
        let main = File::open(&main_path)?;
        log::info!("Opening index {:?}", index_path);
        let index = File::open(&index_path)?;
        Ok(Self::from_sources(main, index, config))
    }
}

impl<R: Read + Seek> Session<R> {
    /// Build a session over arbitrary seekable byte sources
    pub fn from_sources(main: R, index: R, config: SessionConfig) -> Self {
        let dispatcher = TopicDispatcher::new(
            FrameReader::new(main, config.chunk_size),
            config.flow_control_slack,
        );
        let index = IndexController::new(
            FrameReader::new(index, config.chunk_size),
            config.seek_margin,
        );
        Self {
            dispatcher,
            index,
            config,
            reconstructors: HashMap::new(),
            initial_start_time: 0.0,
            start_time: 0.0,
            initial_status: StatusSnapshot::default(),
            status: StatusSnapshot::default(),
        }
    }

    /// Read the first index snapshot and establish the reference time
    pub fn initialize(&mut self) -> Result<&StatusSnapshot> {
        let status = self.index.load_initial()?;
        self.initial_start_time = self.index.initial_time();
        self.start_time = self.initial_start_time;
        self.status = status.clone();
        self.initial_status = status;
        Ok(&self.initial_status)
    }

    /// Status snapshot at the start of the log
    pub fn initial_status(&self) -> &StatusSnapshot {
        &self.initial_status
    }

    /// Status snapshot the main log is currently positioned at
    pub fn current_status(&self) -> &StatusSnapshot {
        &self.status
    }

    /// Names of every dataset category
    pub fn available_datasets(&self) -> Vec<&'static str> {
        CATEGORIES.iter().map(|c| c.name()).collect()
    }

    /// Resolve a `category:instance[:selector]` dataset name
    ///
    /// Reconstructors are shared by every dataset on the same topic.
    pub fn select_dataset(&mut self, name: &str) -> Result<DatasetDescriptor> {
        let parts: Vec<&str> = name.split(':').collect();
        let category = DatasetCategory::from_name(parts[0])
            .ok_or_else(|| DecoderError::UnknownDataset(parts[0].to_string()))?;
        if parts.len() != category.total_parts() {
            return Err(DecoderError::InvalidParameterCount {
                category: category.name().to_string(),
                expected: category.total_parts(),
                found: parts.len(),
            });
        }
        let topic = parts[..category.topic_parts()].join(":");
        if !self.reconstructors.contains_key(&topic) {
            log::debug!("Creating {} reconstructor for '{}'", category.name(), topic);
            self.dispatcher.register_topic(&topic);
            let created = Reconstructor::new(category, &topic, self.config.smoothing_time);
            self.reconstructors.insert(topic.clone(), created);
        }
        self.reconstructors[&topic].describe(name, &parts)
    }

    /// Value of a selected dataset at absolute print time `req_time`
    ///
    /// Times must not decrease between calls for the same topic unless a
    /// [`seek`](Self::seek) happens in between.
    pub fn pull(&mut self, dataset: &DatasetDescriptor, req_time: f64) -> Result<f64> {
        let reconstructor = self
            .reconstructors
            .get_mut(&dataset.topic)
            .ok_or_else(|| DecoderError::UnregisteredTopic(dataset.topic.clone()))?;
        reconstructor.pull(&mut self.dispatcher, dataset.selection, req_time)
    }

    /// Reposition the replay `req_time` seconds after the start of the log
    ///
    /// Every reconstructor restarts from scratch; existing descriptors stay
    /// valid.
    pub fn seek(&mut self, req_time: f64) -> Result<()> {
        let target = self.initial_start_time + req_time;
        self.start_time = target;
        log::info!("Seeking to {:.6} (+{:.3}s)", target, req_time);

        self.index.rewind()?;
        match self.index.seek_to(target)? {
            Some(snapshot) if snapshot.file_position != 0 => {
                self.dispatcher.reposition(snapshot.file_position)?;
                self.status = snapshot.status;
            }
            Some(snapshot) => {
                self.dispatcher.rewind()?;
                self.status = snapshot.status;
            }
            None => {
                self.dispatcher.rewind()?;
                self.status = self.initial_status.clone();
            }
        }
        self.reconstructors.values_mut().for_each(Reconstructor::reset);
        Ok(())
    }

    /// Reference time: the log start, or the last seek target
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Print time of the first index snapshot
    pub fn initial_start_time(&self) -> f64 {
        self.initial_start_time
    }

    /// Most recent status time read from the main log
    pub fn last_read_time(&self) -> f64 {
        self.dispatcher.last_read_time()
    }

    /// True once the main log and every topic queue are exhausted
    pub fn is_drained(&self) -> bool {
        self.dispatcher.is_drained()
    }
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(prefix.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}
