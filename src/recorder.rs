// src/recorder.rs
use crate::config::LoggerConfig;
use crate::drivers::{PstatError, RunningAverage};
use crate::types::RunRecord;
use log::{debug, error, info, warn};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
/// Temperature averaging window, in seconds since run start.
#[derive(Clone, Debug)]
pub struct TempWindow {
    pub t_start: f64,
    pub t_stop: f64,
    pub average: RunningAverage,
}
impl TempWindow {
    pub fn new(t_start: f64, t_stop: f64) -> Self {
        Self {
            t_start,
            t_stop,
            average: RunningAverage::new(),
        }
    }
    pub fn contains(&self, t: f64) -> bool {
        t >= self.t_start && t <= self.t_stop
    }
}
/// Writes one numbered data file per run into a single directory.
///
/// Files are named `{data_prefix}{N}.txt` and, when a temperature stream is
/// configured, `{temp_prefix}{N}.txt`, sharing `N`. When constructed
/// read-only every mutating call returns immediately without touching the
/// directory.
pub struct DataLogger {
    config: LoggerConfig,
    read_only: bool,
    file_count: u32,
    data_writer: Option<BufWriter<File>>,
    temp_writer: Option<BufWriter<File>>,
    /// `None` when no temperature sensor is fitted.
    windows: Option<Vec<TempWindow>>,
}
impl DataLogger {
    /// Never fails: when the directory cannot be prepared the error is logged,
    /// numbering starts from zero and every `start` reports `StorageUnavailable`.
    pub fn new(
        config: LoggerConfig,
        read_only: bool,
        temp_schedule: Option<&[(f64, f64)]>,
    ) -> Self {
        let windows = temp_schedule.map(|schedule| {
            schedule
                .iter()
                .map(|&(start, stop)| TempWindow::new(start, stop))
                .collect()
        });
        let mut logger = Self {
            config,
            read_only,
            file_count: 0,
            data_writer: None,
            temp_writer: None,
            windows,
        };
        let prepared = logger.create_data_dir();
        if let Err(e) = prepared.and_then(|()| logger.init_file_count()) {
            error!("data logging unavailable: {e}");
            logger.file_count = 0;
        }
        logger
    }
    pub fn read_only(&self) -> bool {
        self.read_only
    }
    pub fn file_count(&self) -> u32 {
        self.file_count
    }
    pub fn is_logging(&self) -> bool {
        self.data_writer.is_some()
    }
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }
    /// Name of the latest data file, `None` before the first run or after a reset.
    pub fn data_file_name(&self) -> Option<String> {
        (self.file_count > 0).then(|| self.data_name(self.file_count))
    }
    pub fn data_path(&self, index: u32) -> PathBuf {
        self.config.data_dir.join(self.data_name(index))
    }
    pub fn temp_path(&self, index: u32) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}{}.txt", self.config.temp_prefix, index))
    }
    pub fn windows(&self) -> Option<&[TempWindow]> {
        self.windows.as_deref()
    }
    fn data_name(&self, index: u32) -> String {
        format!("{}{}.txt", self.config.data_prefix, index)
    }
    fn create_data_dir(&mut self) -> Result<(), PstatError> {
        if self.read_only {
            return Ok(());
        }
        let dir = &self.config.data_dir;
        fs::create_dir_all(dir).map_err(|e| PstatError::storage(dir, e))
    }
    /// Resume numbering after a restart by counting existing data files.
    fn init_file_count(&mut self) -> Result<(), PstatError> {
        if self.read_only {
            return Ok(());
        }
        let dir = &self.config.data_dir;
        let entries = fs::read_dir(dir).map_err(|e| PstatError::storage(dir, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PstatError::storage(dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.contains(&self.config.data_prefix) {
                names.push(name);
            }
        }
        self.file_count = names.len() as u32;
        // Numbering is not verified; a gap means the next start overwrites a run.
        let expected: Vec<String> = (1..=self.file_count).map(|i| self.data_name(i)).collect();
        if let Some(stray) = names.iter().find(|n| !expected.contains(n)) {
            warn!(
                "{}: data files are not numbered 1..={} (found {stray}); next run may overwrite",
                dir.display(),
                self.file_count
            );
        }
        info!("{}: {} existing data files", dir.display(), self.file_count);
        Ok(())
    }
    /// Opens the next numbered file(s). On failure the count is left unchanged.
    pub fn start(&mut self) -> Result<(), PstatError> {
        if self.read_only {
            return Ok(());
        }
        if self.is_logging() {
            self.stop();
        }
        let index = self.file_count + 1;
        let data_path = self.data_path(index);
        let temp_path = self.temp_path(index);
        let data = File::create(&data_path).map_err(|e| PstatError::storage(&data_path, e))?;
        let temp = match self.windows.as_mut() {
            Some(windows) => {
                for window in windows.iter_mut() {
                    window.average.reset();
                }
                match File::create(&temp_path) {
                    Ok(f) => Some(f),
                    Err(e) => {
                        drop(data);
                        let _ = fs::remove_file(&data_path);
                        return Err(PstatError::storage(&temp_path, e));
                    }
                }
            }
            None => None,
        };
        self.file_count = index;
        self.data_writer = Some(BufWriter::new(data));
        self.temp_writer = temp.map(BufWriter::new);
        info!("logging to {}", data_path.display());
        Ok(())
    }
    /// Closes the open file(s) and syncs them to the medium.
    pub fn stop(&mut self) {
        if self.read_only {
            return;
        }
        for writer in [self.data_writer.take(), self.temp_writer.take()]
            .into_iter()
            .flatten()
        {
            close_synced(writer);
        }
    }
    /// Deletes every file in the data directory and restarts numbering.
    pub fn reset(&mut self) -> Result<(), PstatError> {
        if self.read_only {
            return Ok(());
        }
        self.stop();
        let dir = &self.config.data_dir;
        let entries = fs::read_dir(dir).map_err(|e| PstatError::storage(dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| PstatError::storage(dir, e))?.path();
            if path.is_file() {
                if let Err(e) = fs::remove_file(&path) {
                    warn!("could not delete {}: {e}", path.display());
                }
            }
        }
        self.file_count = 0;
        info!("{}: data files cleared", dir.display());
        Ok(())
    }
    /// Appends one record. Write failures are logged and the line is skipped.
    pub fn update(&mut self, record: &RunRecord) {
        if self.read_only {
            return;
        }
        let temp_in_data = self.config.temp_in_data_file;
        if let Some(writer) = self.data_writer.as_mut() {
            let mut line = format!(
                "{:.2} {:.2} {:.2}",
                record.elapsed, record.setpoint, record.current_ua
            );
            if let (true, Some(temp)) = (temp_in_data, record.temperature) {
                line.push_str(&format!(" {temp:.2}"));
            }
            write_line(writer, &line);
        }
        let (Some(temp), Some(windows)) = (record.temperature, self.windows.as_mut()) else {
            return;
        };
        let Some(window) = windows.iter_mut().find(|w| w.contains(record.elapsed)) else {
            return;
        };
        window.average.update(temp);
        let line = format!(
            "{:.2} {:.2} {:.2}",
            record.elapsed,
            temp,
            window.average.value()
        );
        match self.temp_writer.as_mut() {
            Some(writer) => write_line(writer, &line),
            None => debug!("temperature line dropped, no open file"),
        }
    }
}
impl Drop for DataLogger {
    fn drop(&mut self) {
        self.stop();
    }
}
/// Whole line goes out in one write and is flushed, so a stop or power cut
/// never leaves half a record behind in the buffer.
fn write_line(writer: &mut BufWriter<File>, line: &str) {
    let result = writer
        .write_all(format!("{line}\n").as_bytes())
        .and_then(|_| writer.flush());
    if let Err(e) = result {
        warn!("log write skipped: {e}");
    }
}
fn close_synced(writer: BufWriter<File>) {
    match writer.into_inner() {
        Ok(file) => {
            if let Err(e) = file.sync_all() {
                warn!("sync failed: {e}");
            }
        }
        Err(e) => warn!("flush on close failed: {}", e.error()),
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    fn config_in(dir: &TempDir) -> LoggerConfig {
        LoggerConfig {
            data_dir: dir.path().join("data_files"),
            ..LoggerConfig::default()
        }
    }
    fn record(elapsed: f64, temperature: Option<f64>) -> RunRecord {
        RunRecord {
            elapsed,
            setpoint: 0.5,
            current_ua: 1.0,
            temperature,
        }
    }
    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
    #[test]
    fn creates_directory_and_numbers_runs() {
        let tmp = TempDir::new().unwrap();
        let mut logger = DataLogger::new(config_in(&tmp), false, None);
        assert!(logger.data_dir().is_dir());
        assert_eq!(logger.data_file_name(), None);
        for _ in 0..3 {
            logger.start().unwrap();
            logger.stop();
        }
        assert_eq!(logger.file_count(), 3);
        assert_eq!(
            listing(logger.data_dir()),
            vec!["data1.txt", "data2.txt", "data3.txt"]
        );
        logger.reset().unwrap();
        assert!(listing(logger.data_dir()).is_empty());
        assert_eq!(logger.file_count(), 0);
        logger.start().unwrap();
        assert_eq!(logger.data_file_name().as_deref(), Some("data1.txt"));
        assert!(logger.data_path(1).is_file());
    }
    #[test]
    fn restart_resumes_numbering() {
        let tmp = TempDir::new().unwrap();
        {
            let mut logger = DataLogger::new(config_in(&tmp), false, None);
            logger.start().unwrap();
            logger.update(&record(0.0, None));
            logger.stop();
            logger.start().unwrap();
            // dropped while logging, like a power-down
        }
        let mut logger = DataLogger::new(config_in(&tmp), false, None);
        assert_eq!(logger.file_count(), 2);
        logger.start().unwrap();
        assert_eq!(logger.data_file_name().as_deref(), Some("data3.txt"));
        let first = fs::read_to_string(logger.data_path(1)).unwrap();
        assert_eq!(first, "0.00 0.50 1.00\n");
    }
    #[test]
    fn read_only_gate_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        let dir = config.data_dir.clone();
        {
            let mut rw = DataLogger::new(config.clone(), false, None);
            rw.start().unwrap();
            rw.stop();
        }
        let before = listing(&dir);
        let mut logger = DataLogger::new(config, true, Some(&[(0.0, 10.0)][..]));
        let count = logger.file_count();
        logger.start().unwrap();
        logger.update(&record(1.0, Some(20.0)));
        logger.reset().unwrap();
        logger.stop();
        assert_eq!(logger.file_count(), count);
        assert!(!logger.is_logging());
        assert_eq!(listing(&dir), before);
        assert_eq!(fs::read_to_string(dir.join("data1.txt")).unwrap(), "");
    }
    #[test]
    fn read_only_does_not_create_directory() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        let logger = DataLogger::new(config.clone(), true, None);
        assert_eq!(logger.file_count(), 0);
        assert!(!config.data_dir.exists());
    }
    #[test]
    fn update_without_start_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut logger = DataLogger::new(config_in(&tmp), false, None);
        logger.update(&record(0.0, None));
        assert!(listing(logger.data_dir()).is_empty());
    }
    #[test]
    fn temperature_column_only_when_combined() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_in(&tmp);
        config.temp_in_data_file = true;
        let mut logger = DataLogger::new(config, false, None);
        logger.start().unwrap();
        logger.update(&record(0.0, Some(21.234)));
        logger.update(&record(0.5, None));
        logger.stop();
        let text = fs::read_to_string(logger.data_path(1)).unwrap();
        assert_eq!(text, "0.00 0.50 1.00 21.23\n0.50 0.50 1.00\n");
    }
    #[test]
    fn windowed_temperature_stream() {
        let tmp = TempDir::new().unwrap();
        let schedule = [(1.0, 2.0), (3.0, 4.0)];
        let mut logger = DataLogger::new(config_in(&tmp), false, Some(&schedule[..]));
        logger.start().unwrap();
        for (t, temp) in [(0.5, 19.0), (1.0, 20.0), (1.5, 22.0), (2.5, 30.0), (3.0, 25.0)] {
            logger.update(&record(t, Some(temp)));
        }
        logger.stop();
        let text = fs::read_to_string(logger.temp_path(1)).unwrap();
        assert_eq!(text, "1.00 20.00 20.00\n1.50 22.00 21.00\n3.00 25.00 25.00\n");
        let data = fs::read_to_string(logger.data_path(1)).unwrap();
        assert_eq!(data.lines().count(), 5);
        // a new run starts the window averages over
        logger.start().unwrap();
        logger.update(&record(1.0, Some(10.0)));
        logger.stop();
        let text = fs::read_to_string(logger.temp_path(2)).unwrap();
        assert_eq!(text, "1.00 10.00 10.00\n");
        let windows = logger.windows().unwrap();
        assert_eq!(windows[0].average.count(), 1);
        assert_eq!(windows[1].average.count(), 0);
    }
    #[test]
    fn temperature_file_counted_separately() {
        let tmp = TempDir::new().unwrap();
        {
            let schedule = [(0.0, 1.0)];
            let mut logger =
                DataLogger::new(config_in(&tmp), false, Some(&schedule[..]));
            logger.start().unwrap();
        }
        let logger = DataLogger::new(config_in(&tmp), false, None);
        assert_eq!(logger.file_count(), 1);
        assert_eq!(listing(logger.data_dir()), vec!["data1.txt", "temp1.txt"]);
    }
    #[test]
    fn unusable_directory_is_reported_on_start() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not_a_dir");
        fs::write(&blocker, "").unwrap();
        let config = LoggerConfig {
            data_dir: blocker.join("data_files"),
            ..LoggerConfig::default()
        };
        let mut logger = DataLogger::new(config, false, None);
        assert_eq!(logger.file_count(), 0);
        let err = logger.start().unwrap_err();
        assert!(matches!(err, PstatError::StorageUnavailable { .. }));
        assert!(!err.is_fatal());
        assert!(!logger.is_logging());
        logger.update(&record(0.0, None));
        logger.stop();
    }
    #[test]
    fn start_fails_when_directory_vanishes() {
        let tmp = TempDir::new().unwrap();
        let mut logger = DataLogger::new(config_in(&tmp), false, None);
        fs::remove_dir(logger.data_dir()).unwrap();
        let err = logger.start().unwrap_err();
        assert!(matches!(err, PstatError::StorageUnavailable { .. }));
        assert_eq!(logger.file_count(), 0);
        assert!(!logger.is_logging());
    }
}
