//! Engine-level regression testing helpers.
//!
//! These utilities help you:
//! - hash every frame of a `TimeMachine` by its serialized state,
//! - save the recording as JSON, reload it and re-simulate the same inputs, and
//! - compare per-frame hashes against a golden file kept next to the tests.
//!
//! The engine stays game-agnostic: any `GameLogic` whose state is serde-serializable works.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

use crate::{GameLogic, HeadlessRunner, TimeMachine};

/// Environment flag helper: accepts `1/true/yes/on` (case-insensitive).
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// If set, regression tests may update golden files in-place.
pub fn update_goldens_enabled() -> bool {
    env_flag("ROGUETRIS_UPDATE_GOLDENS")
}

pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[macro_export]
macro_rules! regression_golden_path {
    ($name:expr) => {{
        let base = $crate::regression::sanitize_filename($name);
        ::std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("goldens")
            .join(format!("{base}.json"))
    }};
}

pub fn bytes_sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash of the compact JSON encoding of `state`.
pub fn state_sha256_hex<S: Serialize>(state: &S) -> io::Result<String> {
    let bytes = serde_json::to_vec(state).map_err(io::Error::other)?;
    Ok(bytes_sha256_hex(&bytes))
}

pub fn history_hashes<S: Serialize>(history: &[S]) -> io::Result<Vec<String>> {
    history.iter().map(state_sha256_hex).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateHashGolden {
    pub version: u32,
    pub name: String,
    pub hash_alg: String,
    /// One hash per recorded frame, frame 0 included.
    pub hashes: Vec<String>,
}

impl StateHashGolden {
    pub fn new(name: impl Into<String>, hashes: Vec<String>) -> Self {
        Self {
            version: 1,
            name: name.into(),
            hash_alg: "sha256".to_string(),
            hashes,
        }
    }
}

pub fn load_golden_json(path: impl AsRef<Path>) -> io::Result<StateHashGolden> {
    let path = path.as_ref();
    let file = fs::File::open(path)?;
    let reader = io::BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("failed parsing golden json {}: {e}", path.display()),
        )
    })
}

pub fn save_golden_json(path: impl AsRef<Path>, golden: &StateHashGolden) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = fs::File::create(path)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, golden).map_err(io::Error::other)?;
    writer.flush()?;
    Ok(())
}

pub fn assert_or_update_golden_json(
    path: impl AsRef<Path>,
    golden: &StateHashGolden,
    update: bool,
) -> io::Result<()> {
    let path = path.as_ref();
    let exists = path.exists();

    if update || !exists {
        save_golden_json(path, golden)?;
        if !exists {
            log::info!("wrote golden: {}", path.display());
        } else {
            log::info!("updated golden: {}", path.display());
        }
        return Ok(());
    }

    let expected = load_golden_json(path)?;
    if expected.version != golden.version || expected.hash_alg != golden.hash_alg {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "golden metadata mismatch at {}:\nexpected: v{} alg={}\nactual:   v{} alg={}\n(hint: set ROGUETRIS_UPDATE_GOLDENS=1 to rewrite)",
                path.display(),
                expected.version,
                expected.hash_alg,
                golden.version,
                golden.hash_alg,
            ),
        ));
    }

    if expected.hashes.len() != golden.hashes.len() {
        return Err(io::Error::other(format!(
            "golden frame count mismatch at {}: expected {} hashes, got {}\n(hint: set ROGUETRIS_UPDATE_GOLDENS=1 to rewrite)",
            path.display(),
            expected.hashes.len(),
            golden.hashes.len()
        )));
    }

    for (i, (a, b)) in expected.hashes.iter().zip(golden.hashes.iter()).enumerate() {
        if a != b {
            return Err(io::Error::other(format!(
                "golden mismatch at {} (frame {i}):\nexpected: {a}\nactual:   {b}\n(hint: set ROGUETRIS_UPDATE_GOLDENS=1 to rewrite)",
                path.display()
            )));
        }
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct RecordReplayArtifacts {
    pub state_json: PathBuf,
    pub hashes: Vec<String>,
}

/// Engine-level regression helper:
/// - run a scenario live and save the `TimeMachine` JSON recording
/// - reload the recording and check every stored state hashes like the live one
/// - re-simulate the same inputs from the reloaded frame 0 and check every frame again
///
/// Returns the live per-frame hashes so callers can pin them in a golden file.
pub fn record_then_replay_and_compare<G>(
    name: &str,
    out_dir: impl AsRef<Path>,
    game: G,
    inputs: impl IntoIterator<Item = G::Input>,
) -> io::Result<RecordReplayArtifacts>
where
    G: GameLogic + Clone,
    G::State: Serialize + DeserializeOwned + Clone,
    G::Input: Clone,
{
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir)?;
    let state_json = out_dir.join(format!("{}.json", sanitize_filename(name)));

    let inputs: Vec<G::Input> = inputs.into_iter().collect();

    let mut live = HeadlessRunner::new(game.clone());
    live.run(inputs.iter().cloned());
    let live_hashes = history_hashes(live.history())?;
    live.timemachine().save_json_file(&state_json)?;

    let loaded = TimeMachine::<G::State>::load_json_file(&state_json)?;
    let loaded_hashes = history_hashes(loaded.history())?;
    compare_hashes("reloaded", &live_hashes, &loaded_hashes)?;

    let start = loaded
        .state_at(0)
        .cloned()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "empty recording"))?;
    let mut replay = HeadlessRunner::from_timemachine(game, TimeMachine::new(start));
    replay.run(inputs);
    let replay_hashes = history_hashes(replay.history())?;
    compare_hashes("replayed", &live_hashes, &replay_hashes)?;

    Ok(RecordReplayArtifacts {
        state_json,
        hashes: live_hashes,
    })
}

fn compare_hashes(label: &str, live: &[String], other: &[String]) -> io::Result<()> {
    if live.len() != other.len() {
        return Err(io::Error::other(format!(
            "{label} frame count differed: live={} {label}={}",
            live.len(),
            other.len()
        )));
    }
    for (i, (a, b)) in live.iter().zip(other.iter()).enumerate() {
        if a != b {
            return Err(io::Error::other(format!(
                "{label} frame {i} differed:\nlive:   {a}\n{label}: {b}"
            )));
        }
    }
    Ok(())
}
