//! Level files: parsing, loading, capture and persistence.
//!
//! A level is a list of object entries plus world settings:
//!
//! ```json
//! {
//!   "objects": [ { "$type": "Wall", "data": { "version": 1, "name": "Wall", ... } } ],
//!   "width": 800,
//!   "height": 450,
//!   "background": "#87ceeb"
//! }
//! ```
//!
//! Object entries are written in the `{ "$type", "data" }` envelope; the
//! flattened `{ "$type", ...fields }` form is accepted on load. The legacy
//! pre-module format (`obstacles`, `goals`, `gates`, `spawn`) is translated
//! into object entries on load and never written.
//!
//! Loading never panics and never stops at the first bad object. Every
//! problem becomes an [`ErrorReport`] in the [`LevelLoadReport`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use ollie_core::fallible::{attempt, ErrorReport, PartialFailure};
use ollie_core::math::Vec2;
use ollie_core::serializer::TypedDto;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::GameEvent;
use crate::game::{Game, GameConfig, LoopState};
use crate::object::{GameObject, ObjectId, EDITOR_TAG, LEVEL_OBJECT_TAG};
use crate::prefabs::{gate_entry, goal_entry, spawn_point_entry, wall_circle_entry, wall_rect_entry};
use crate::registry::OBJECT_SERIALIZER;

// ---------------------------------------------------------------------------
// LevelFile
// ---------------------------------------------------------------------------

/// A level as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelFile {
    #[serde(default)]
    pub objects: Vec<TypedDto>,
    pub width: f64,
    pub height: f64,
    pub background: String,
}

impl Default for LevelFile {
    fn default() -> Self {
        let config = GameConfig::default();
        Self {
            objects: Vec::new(),
            width: config.width,
            height: config.height,
            background: config.background,
        }
    }
}

/// Result of [`LevelFile::parse`]: everything that could be read, plus one
/// report per entry that could not.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLevel {
    pub file: LevelFile,
    pub errors: Vec<ErrorReport>,
}

impl LevelFile {
    /// Parse a level document in either format.
    ///
    /// Fails only when the document is not a JSON object. Bad entries and
    /// bad world settings are reported in [`ParsedLevel::errors`] and
    /// skipped or defaulted.
    pub fn parse(json: &str) -> Result<ParsedLevel, ErrorReport> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ErrorReport::new("level is not valid JSON").with_cause(e.to_string()))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<ParsedLevel, ErrorReport> {
        let Value::Object(doc) = value else {
            return Err(ErrorReport::new("level must be a JSON object"));
        };

        let mut file = LevelFile::default();
        let mut errors = Vec::new();

        for (field, slot) in [("width", &mut file.width), ("height", &mut file.height)] {
            match doc.get(field) {
                None => {}
                Some(v) => match v.as_f64() {
                    Some(n) if n.is_finite() && n > 0.0 => *slot = n,
                    _ => errors.push(ErrorReport::new(format!(
                        "{field} must be a positive number, got {v}"
                    ))),
                },
            }
        }
        match doc.get("background") {
            None => {}
            Some(Value::String(color)) => file.background = color.clone(),
            Some(other) => errors.push(ErrorReport::new(format!(
                "background must be a string, got {other}"
            ))),
        }

        match doc.get("objects") {
            None => {}
            Some(Value::Array(entries)) => {
                for (i, entry) in entries.iter().enumerate() {
                    match TypedDto::from_value(entry) {
                        Ok(dto) => file.objects.push(dto),
                        Err(e) => errors.push(ErrorReport::new(format!("objects[{i}]: {e}"))),
                    }
                }
            }
            Some(_) => errors.push(ErrorReport::new("objects must be an array")),
        }

        if LEGACY_KEYS.iter().any(|k| doc.contains_key(*k)) {
            let before = file.objects.len();
            translate_legacy(doc, &mut file.objects, &mut errors);
            tracing::warn!(
                translated = file.objects.len() - before,
                "translated legacy level format"
            );
        }

        Ok(ParsedLevel { file, errors })
    }

    pub fn world_size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn to_value(&self) -> Value {
        let mut doc = serde_json::Map::new();
        doc.insert(
            "objects".to_owned(),
            Value::Array(self.objects.iter().map(TypedDto::to_value).collect()),
        );
        doc.insert("width".to_owned(), self.width.into());
        doc.insert("height".to_owned(), self.height.into());
        doc.insert("background".to_owned(), self.background.clone().into());
        Value::Object(doc)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_value()).unwrap_or_default()
    }

    /// BLAKE3 hex digest of the canonical JSON form. Equal levels have equal
    /// fingerprints.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(&self.to_value()).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }
}

// ---------------------------------------------------------------------------
// Legacy format
// ---------------------------------------------------------------------------

const LEGACY_KEYS: [&str; 4] = ["obstacles", "goals", "gates", "spawn"];

#[derive(Deserialize)]
struct LegacyRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

#[derive(Deserialize)]
struct LegacyCircle {
    x: f64,
    y: f64,
    radius: f64,
}

#[derive(Deserialize)]
struct LegacyPoint {
    x: f64,
    y: f64,
}

fn legacy_field<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, String> {
    serde_json::from_value(value.clone()).map_err(|e| e.to_string())
}

fn legacy_obstacle(entry: &Value) -> Result<TypedDto, String> {
    let kind = entry
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing obstacle \"type\"".to_owned())?;
    match kind {
        "obstacle_rectangle" => {
            let r: LegacyRect = legacy_field(entry)?;
            Ok(wall_rect_entry(Vec2::new(r.x, r.y), Vec2::new(r.width, r.height)))
        }
        "obstacle_circle" => {
            let c: LegacyCircle = legacy_field(entry)?;
            Ok(wall_circle_entry(Vec2::new(c.x, c.y), c.radius))
        }
        other => Err(format!("unknown obstacle type \"{other}\"")),
    }
}

fn legacy_rects(
    doc: &serde_json::Map<String, Value>,
    key: &str,
    build: fn(Vec2, Vec2) -> TypedDto,
    objects: &mut Vec<TypedDto>,
    errors: &mut Vec<ErrorReport>,
) {
    let Some(entries) = doc.get(key) else {
        return;
    };
    let Some(entries) = entries.as_array() else {
        errors.push(ErrorReport::new(format!("{key} must be an array")));
        return;
    };
    for (i, entry) in entries.iter().enumerate() {
        match legacy_field::<LegacyRect>(entry) {
            Ok(r) => objects.push(build(Vec2::new(r.x, r.y), Vec2::new(r.width, r.height))),
            Err(e) => errors.push(ErrorReport::new(format!("{key}[{i}]: {e}"))),
        }
    }
}

fn translate_legacy(
    doc: &serde_json::Map<String, Value>,
    objects: &mut Vec<TypedDto>,
    errors: &mut Vec<ErrorReport>,
) {
    match doc.get("obstacles") {
        None => {}
        Some(Value::Array(entries)) => {
            for (i, entry) in entries.iter().enumerate() {
                match legacy_obstacle(entry) {
                    Ok(dto) => objects.push(dto),
                    Err(e) => errors.push(ErrorReport::new(format!("obstacles[{i}]: {e}"))),
                }
            }
        }
        Some(_) => errors.push(ErrorReport::new("obstacles must be an array")),
    }
    legacy_rects(doc, "goals", goal_entry, objects, errors);
    legacy_rects(doc, "gates", gate_entry, objects, errors);
    match doc.get("spawn") {
        None | Some(Value::Null) => {}
        Some(spawn) => match legacy_field::<LegacyPoint>(spawn) {
            Ok(p) => objects.push(spawn_point_entry(Vec2::new(p.x, p.y))),
            Err(e) => errors.push(ErrorReport::new(format!("spawn: {e}"))),
        },
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Outcome of [`load_level`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelLoadReport {
    /// Objects spawned, in file order.
    pub objects: Vec<ObjectId>,
    pub errors: Vec<ErrorReport>,
}

impl LevelLoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Spawn one object entry.
///
/// The entry's `$type` selects the object type; its payload is a
/// [`GameObjectDto`](crate::object::GameObjectDto). Module failures yield a
/// partial failure that still carries the spawned object.
pub fn spawn_entry(game: &mut Game, entry: &TypedDto) -> Result<ObjectId, PartialFailure<ObjectId>> {
    let behavior_data = entry.data.get("behavior").cloned().unwrap_or(Value::Null);
    let behavior = OBJECT_SERIALIZER
        .deserialize_dto(&TypedDto::new(entry.type_key.clone(), behavior_data), &mut ())
        .map_err(PartialFailure::failed)?;
    GameObject::deserialize_partial(&entry.data, game, behavior)
}

/// Replace the current level with the one in `json`.
///
/// Every object except editor tooling is destroyed, the world settings are
/// applied, each entry is spawned and `levelStart` is emitted. A running
/// game then restarts so runtime objects (the player) are recreated.
///
/// A document that cannot be parsed at all leaves the scene untouched.
pub fn load_level(json: &str, game: &mut Game) -> LevelLoadReport {
    let parsed = match LevelFile::parse(json) {
        Ok(parsed) => parsed,
        Err(report) => {
            tracing::warn!(error = %report, "level rejected");
            return LevelLoadReport {
                objects: Vec::new(),
                errors: vec![report],
            };
        }
    };
    load_parsed(parsed, game)
}

/// [`load_level`] for an already parsed level.
pub fn load_parsed(parsed: ParsedLevel, game: &mut Game) -> LevelLoadReport {
    let ParsedLevel { file, errors } = parsed;
    let mut report = LevelLoadReport {
        objects: Vec::new(),
        errors,
    };

    let mark = game.hook_mark();
    let outcome = attempt(|| {
        let cleared = game.destroy_some(|o| !o.has_tag(EDITOR_TAG));
        tracing::debug!(cleared, "cleared scene for level load");
        game.set_world_size(file.world_size());
        game.set_background(file.background.clone());

        for (i, entry) in file.objects.iter().enumerate() {
            match spawn_entry(game, entry) {
                Ok(id) => report.objects.push(id),
                Err(failure) => {
                    let mut error = ErrorReport::new(format!(
                        "objects[{i}]: failed to load \"{}\"",
                        entry.type_key
                    ));
                    for message in &failure.errors {
                        error = error.with_cause(message.clone());
                    }
                    tracing::warn!(index = i, type_key = %entry.type_key, error = %failure, "object failed to load");
                    if let Some(id) = failure.result {
                        report.objects.push(id);
                    }
                    report.errors.push(error);
                }
            }
        }

        game.emit(GameEvent::LevelStart);
        if game.state() == LoopState::Running {
            game.restart();
        }
    });
    if let Err(panic) = outcome {
        game.recover_from_panic(mark);
        report
            .errors
            .push(ErrorReport::new("level load aborted").with_cause(panic.to_string()));
    }

    tracing::info!(
        objects = report.objects.len(),
        errors = report.errors.len(),
        "level loaded"
    );
    report
}

/// Snapshot the current level: every object except runtime objects and
/// editor tooling, plus the world settings. Objects whose type is not
/// registered are skipped.
pub fn capture_level(game: &Game) -> LevelFile {
    let objects = game
        .scene()
        .query(|o| !o.has_tag(LEVEL_OBJECT_TAG) && !o.has_tag(EDITOR_TAG))
        .filter_map(|o| {
            let entry = o.serialize_typed();
            if entry.is_none() {
                tracing::trace!(object = %o.id(), "skipping unregistered object type");
            }
            entry
        })
        .collect();
    let size = game.world_size();
    LevelFile {
        objects,
        width: size.x,
        height: size.y,
        background: game.background().to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Key-value persistence for level documents, keyed by level name.
pub trait LevelStore {
    /// Level names in ascending order.
    fn list(&self) -> Result<Vec<String>, anyhow::Error>;

    fn load(&self, name: &str) -> Result<Option<String>, anyhow::Error>;

    fn save(&mut self, name: &str, json: &str) -> Result<(), anyhow::Error>;

    /// Returns whether a level was removed.
    fn delete(&mut self, name: &str) -> Result<bool, anyhow::Error>;
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryLevelStore {
    levels: BTreeMap<String, String>,
}

impl MemoryLevelStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LevelStore for MemoryLevelStore {
    fn list(&self) -> Result<Vec<String>, anyhow::Error> {
        Ok(self.levels.keys().cloned().collect())
    }

    fn load(&self, name: &str) -> Result<Option<String>, anyhow::Error> {
        Ok(self.levels.get(name).cloned())
    }

    fn save(&mut self, name: &str, json: &str) -> Result<(), anyhow::Error> {
        validate_level_name(name)?;
        self.levels.insert(name.to_owned(), json.to_owned());
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<bool, anyhow::Error> {
        Ok(self.levels.remove(name).is_some())
    }
}

/// One `<name>.json` file per level in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryLevelStore {
    root: PathBuf,
}

impl DirectoryLevelStore {
    /// Use `root`, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, anyhow::Error> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create level directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, anyhow::Error> {
        validate_level_name(name)?;
        Ok(self.root.join(format!("{name}.json")))
    }
}

impl LevelStore for DirectoryLevelStore {
    fn list(&self) -> Result<Vec<String>, anyhow::Error> {
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed to read level directory {}", self.root.display()))?;
        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn load(&self, name: &str) -> Result<Option<String>, anyhow::Error> {
        let path = self.path_of(name)?;
        match fs::read_to_string(&path) {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read level {}", path.display())),
        }
    }

    fn save(&mut self, name: &str, json: &str) -> Result<(), anyhow::Error> {
        let path = self.path_of(name)?;
        fs::write(&path, json).with_context(|| format!("failed to write level {}", path.display()))
    }

    fn delete(&mut self, name: &str) -> Result<bool, anyhow::Error> {
        let path = self.path_of(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("failed to delete level {}", path.display())),
        }
    }
}

/// Level names are non-empty and use only ASCII letters, digits, `-` and `_`.
fn validate_level_name(name: &str) -> Result<(), anyhow::Error> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(anyhow::anyhow!("invalid level name {name:?}"))
    }
}

/// Capture the current level and store it under `name`. Returns the saved
/// level's fingerprint.
pub fn save_level(game: &Game, store: &mut dyn LevelStore, name: &str) -> Result<String, ErrorReport> {
    let level = capture_level(game);
    store
        .save(name, &level.to_json())
        .with_context(|| format!("failed to save level {name:?}"))
        .map_err(|e| ErrorReport::from_anyhow(&e))?;
    tracing::info!(level = name, objects = level.objects.len(), "level saved");
    Ok(level.fingerprint())
}

/// Load level `name` from `store` into `game`.
pub fn load_level_from_store(store: &dyn LevelStore, name: &str, game: &mut Game) -> LevelLoadReport {
    match store.load(name) {
        Ok(Some(json)) => load_level(&json, game),
        Ok(None) => LevelLoadReport {
            objects: Vec::new(),
            errors: vec![ErrorReport::new(format!("level {name:?} not found"))],
        },
        Err(e) => LevelLoadReport {
            objects: Vec::new(),
            errors: vec![ErrorReport::from_anyhow(
                &e.context(format!("failed to load level {name:?}")),
            )],
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::collider::RectangleCollider2d;
    use crate::prefabs::{Goal, Spawn, Wall};
    use serde_json::json;

    // -- 1. Parsing ----------------------------------------------------------

    #[test]
    fn parse_accepts_both_entry_forms() {
        let json = json!({
            "objects": [
                { "$type": "Wall", "data": { "version": 1, "name": "a", "transform": [0.0, 0.0] } },
                { "$type": "Wall", "version": 1, "name": "b", "transform": [1.0, 2.0] },
                { "data": {} },
            ],
            "width": 1000,
        });
        let parsed = LevelFile::from_value(&json).unwrap();
        assert_eq!(parsed.file.objects.len(), 2);
        assert_eq!(parsed.file.width, 1000.0);
        assert_eq!(parsed.file.height, 450.0);
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.errors[0].message.starts_with("objects[2]: "));
    }

    #[test]
    fn parse_rejects_non_objects() {
        assert!(LevelFile::parse("[1, 2]").is_err());
        assert!(LevelFile::parse("{ nope").is_err());
    }

    #[test]
    fn bad_world_settings_are_reported_and_defaulted() {
        let parsed = LevelFile::from_value(&json!({ "width": -5, "background": 3 })).unwrap();
        assert_eq!(parsed.file.width, 800.0);
        assert_eq!(parsed.file.background, "#87ceeb");
        assert_eq!(parsed.errors.len(), 2);
    }

    // -- 2. Legacy translation -----------------------------------------------

    #[test]
    fn legacy_format_is_translated() {
        let json = json!({
            "obstacles": [
                { "type": "obstacle_rectangle", "x": 10, "y": 20, "width": 30, "height": 40 },
                { "type": "obstacle_circle", "x": 5, "y": 5, "radius": 3 },
                { "type": "obstacle_spikes", "x": 0, "y": 0 },
            ],
            "goals": [ { "x": 700, "y": 0, "width": 50, "height": 450 } ],
            "spawn": { "x": 40, "y": 200 },
        });
        let parsed = LevelFile::from_value(&json).unwrap();
        let keys: Vec<&str> = parsed.file.objects.iter().map(|o| o.type_key.as_str()).collect();
        assert_eq!(keys, vec!["Wall", "Wall", "Goal", "Spawn"]);
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.errors[0].message.contains("obstacle_spikes"));
    }

    // -- 3. Loading ------------------------------------------------------------

    #[test]
    fn load_spawns_objects_and_applies_settings() {
        let mut game = Game::default();
        let json = json!({
            "obstacles": [ { "type": "obstacle_rectangle", "x": 10, "y": 20, "width": 30, "height": 40 } ],
            "spawn": { "x": 40, "y": 200 },
            "width": 1600,
            "height": 900,
            "background": "#000000",
        })
        .to_string();

        let report = load_level(&json, &mut game);
        assert!(report.is_clean(), "{:?}", report.errors);
        assert_eq!(report.objects.len(), 2);
        assert_eq!(game.world_size(), Vec2::new(1600.0, 900.0));
        assert_eq!(game.background(), "#000000");

        let wall = game.object(report.objects[0]);
        assert!(wall.behavior_as::<Wall>().is_some());
        assert_eq!(wall.position(), Vec2::new(10.0, 20.0));
        assert!(game.object(report.objects[1]).behavior_as::<Spawn>().is_some());
    }

    #[test]
    fn load_keeps_going_past_bad_objects() {
        let mut game = Game::default();
        let json = json!({
            "objects": [
                { "$type": "Teleporter", "data": { "version": 1, "name": "t" } },
                { "$type": "Goal", "data": {
                    "version": 1, "name": "g", "layer": 0, "tags": [], "transform": [0.0, 0.0],
                    "modules": [
                        { "$type": "RectangleCollider2d", "data": { "size": [10.0, 10.0] } },
                        { "$type": "RectangleCollider2d", "data": { "size": [-1.0, 10.0] } },
                    ]
                } },
            ],
        })
        .to_string();

        let report = load_level(&json, &mut game);
        assert_eq!(report.objects.len(), 1);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].cause[0].contains("Teleporter"));
        assert!(report.errors[1].cause[0].starts_with("module[1]: "));

        let goal = game.object(report.objects[0]);
        assert!(goal.behavior_as::<Goal>().is_some());
        assert_eq!(goal.modules.iter_of::<RectangleCollider2d>().count(), 1);
    }

    struct FailsToInitialize;

    impl crate::module::Module for FailsToInitialize {
        fn initialize(&mut self, ctx: &mut crate::module::ModuleContext<'_>) {
            ctx.on_game_event("gameStart", |_, _, _| {});
            panic!("module failed to initialize");
        }
    }

    #[test]
    fn panic_during_load_leaves_no_stray_objects_or_subscriptions() {
        let level = json!({ "spawn": { "x": 40, "y": 200 } }).to_string();

        let mut clean = Game::default();
        assert!(load_level(&level, &mut clean).is_clean());

        let mut game = Game::default();
        game.on_global_event("levelStart", |game, _| {
            game.spawn_plain(|o| {
                o.modules.add(Box::new(FailsToInitialize));
            });
        });
        let report = load_level(&level, &mut game);

        let last = report.errors.last().unwrap();
        assert_eq!(last.message, "level load aborted");
        assert!(last.cause[0].contains("module failed to initialize"));
        assert_eq!(game.scene().len(), clean.scene().len());
        assert_eq!(game.events().len(), clean.events().len());
        assert_eq!(game.events().count_for("levelStart"), 0);

        // Hooks and events still run normally afterwards.
        game.start();
        game.tick();
        assert_eq!(game.scene().find_by_tag(crate::modules::spawner::PLAYER_TAG).count(), 1);
        game.stop();
        assert!(game.scene().is_empty());
        assert!(game.events().is_empty());
    }

    #[test]
    fn unparseable_level_leaves_scene_alone() {
        let mut game = Game::default();
        let keep = game.spawn_plain(|_| {});
        let report = load_level("not json", &mut game);
        assert_eq!(report.errors.len(), 1);
        assert!(game.scene().contains(keep));
    }

    // -- 4. Capture ------------------------------------------------------------

    #[test]
    fn capture_round_trips_through_load() {
        let mut game = Game::default();
        spawn_entry(&mut game, &wall_rect_entry(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0))).unwrap();
        spawn_entry(&mut game, &goal_entry(Vec2::new(50.0, 0.0), Vec2::new(10.0, 10.0))).unwrap();
        game.spawn_plain(|o| {
            o.with_tag(LEVEL_OBJECT_TAG);
        });
        game.spawn_plain(|o| {
            o.with_tag(EDITOR_TAG);
        });

        let level = capture_level(&game);
        assert_eq!(level.objects.len(), 2);

        let mut other = Game::default();
        let report = load_level(&level.to_json(), &mut other);
        assert!(report.is_clean(), "{:?}", report.errors);
        assert_eq!(capture_level(&other).fingerprint(), level.fingerprint());
    }

    #[test]
    fn fingerprint_tracks_content() {
        let mut game = Game::default();
        let before = capture_level(&game).fingerprint();
        assert_eq!(before, capture_level(&game).fingerprint());
        spawn_entry(&mut game, &spawn_point_entry(Vec2::new(1.0, 1.0))).unwrap();
        assert_ne!(before, capture_level(&game).fingerprint());
    }

    // -- 5. Stores -------------------------------------------------------------

    #[test]
    fn memory_store_saves_and_loads() {
        let mut store = MemoryLevelStore::new();
        let mut game = Game::default();
        spawn_entry(&mut game, &wall_rect_entry(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0))).unwrap();

        let fingerprint = save_level(&game, &mut store, "level-1").unwrap();
        assert_eq!(store.list().unwrap(), vec!["level-1".to_owned()]);

        let mut other = Game::default();
        let report = load_level_from_store(&store, "level-1", &mut other);
        assert!(report.is_clean());
        assert_eq!(capture_level(&other).fingerprint(), fingerprint);

        let missing = load_level_from_store(&store, "level-2", &mut other);
        assert!(missing.errors[0].message.contains("not found"));
        assert!(save_level(&game, &mut store, "../escape").is_err());
        assert!(store.delete("level-1").unwrap());
        assert!(!store.delete("level-1").unwrap());
    }

    #[test]
    fn directory_store_uses_one_file_per_level() {
        let root = std::env::temp_dir().join(format!(
            "ollie-levels-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        let mut store = DirectoryLevelStore::open(&root).unwrap();
        store.save("b", "{}").unwrap();
        store.save("a", "{}").unwrap();

        assert!(root.join("a.json").exists());
        assert_eq!(store.list().unwrap(), vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(store.load("a").unwrap().as_deref(), Some("{}"));
        assert_eq!(store.load("c").unwrap(), None);
        assert!(store.load("a/b").is_err());
        assert!(store.delete("b").unwrap());

        fs::remove_dir_all(&root).unwrap();
    }
}
