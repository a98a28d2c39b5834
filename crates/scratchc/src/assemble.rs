//! Project assembler (§4.6): folds a [`LoweredProgram`] and a [`SymbolTable`]
//! into the project envelope shape that the CLI packager serializes straight
//! into `project.json` inside the `.sb3` archive.

use indexmap::IndexMap;
use serde::Serialize;

use crate::blocks::BlockStore;
use crate::lower::LoweredProgram;
use crate::symbols::SymbolTable;

/// Fixed content-hash ids for the bundled placeholder assets. The packager
/// (`scratchc-cli::package`) copies the matching `<hash>.svg` file out of its
/// bundled asset directory into the archive under these same names.
pub const STAGE_BACKDROP_ASSET_HASH: &str = "cd21514d0531fdffb22204e0ec5ed84a";
pub const SPRITE_COSTUME_ASSET_HASH: &str = "bcf454acf82e4504149f7ffe07b4c785";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Costume {
    pub name: String,
    pub asset_id: String,
    pub data_format: String,
    pub md5ext: String,
    pub rotation_center_x: f64,
    pub rotation_center_y: f64,
}

impl Costume {
    fn new(name: impl Into<String>, asset_hash: &str) -> Self {
        Self {
            name: name.into(),
            asset_id: asset_hash.to_string(),
            data_format: "svg".to_string(),
            md5ext: format!("{asset_hash}.svg"),
            rotation_center_x: 0.0,
            rotation_center_y: 0.0,
        }
    }
}

/// One entry of a target's `variables`/`lists` map: `[name, value]`. The
/// target environment keys these maps by an opaque variable id; this
/// compiler reuses the variable's own name as its id, the same convention
/// already used for [`crate::blocks::VariableReporter`] and
/// [`crate::blocks::Field`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum VarEntry {
    Scalar(String, f64),
    List(String, Vec<String>),
}

/// A target record (§4.6, §6 project envelope schema). Stage and sprite
/// share every field except the handful named in the `Some`-only-for-stage
/// or `Some`-only-for-sprite comments below; unifying them into one struct
/// with `#[serde(skip_serializing_if = "Option::is_none")]` mirrors how the
/// target environment's own schema treats the two shapes as one family with
/// optional fields rather than as a sum type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub is_stage: bool,
    pub name: String,
    pub variables: IndexMap<String, VarEntry>,
    pub lists: IndexMap<String, VarEntry>,
    pub broadcasts: IndexMap<String, String>,
    pub blocks: BlockStore,
    pub comments: IndexMap<String, serde_json::Value>,
    pub current_costume: u32,
    pub costumes: Vec<Costume>,
    pub sounds: Vec<serde_json::Value>,
    pub volume: f64,
    pub layer_order: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_transparency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_to_speech_language: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_style: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub semver: String,
    pub vm: String,
    pub agent: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectEnvelope {
    pub targets: Vec<Target>,
    pub monitors: Vec<serde_json::Value>,
    pub extensions: Vec<String>,
    pub meta: Meta,
}

impl ProjectEnvelope {
    /// The `md5ext` filename of every costume referenced by any target, in
    /// target/costume order. The packager (`scratchc-cli::package`) copies
    /// each of these verbatim out of its bundled asset directory; this is
    /// the only coupling the library crate exposes to that opaque-blob copy.
    pub fn asset_filenames(&self) -> Vec<&str> {
        self.targets
            .iter()
            .flat_map(|target| target.costumes.iter().map(|costume| costume.md5ext.as_str()))
            .collect()
    }
}

/// Builds the project envelope for one compiled program (§4.6). `lowered`'s
/// block store becomes the sprite's scripts; the stage carries no scripts
/// and no variables of its own, matching a freshly-created target-environment
/// project before any stage-scoped globals are added.
pub fn assemble(lowered: LoweredProgram, symbols: &SymbolTable) -> ProjectEnvelope {
    let visible = !lowered
        .blocks
        .iter()
        .any(|(_, block)| block.opcode.as_str() == "looks_say");

    let mut variables: IndexMap<String, VarEntry> = IndexMap::new();
    for name in &symbols.variables {
        let value = symbols.object_initial_values.get(name).copied().unwrap_or(0.0);
        variables.insert(name.clone(), VarEntry::Scalar(name.clone(), value));
    }
    for name in &lowered.extra_variables {
        variables
            .entry(name.clone())
            .or_insert_with(|| VarEntry::Scalar(name.clone(), 0.0));
    }

    let mut lists: IndexMap<String, VarEntry> = IndexMap::new();
    for name in &symbols.lists {
        let values = symbols.list_initial_values.get(name).cloned().unwrap_or_default();
        lists.insert(name.clone(), VarEntry::List(name.clone(), values));
    }

    let stage = Target {
        is_stage: true,
        name: "Stage".to_string(),
        variables: IndexMap::new(),
        lists: IndexMap::new(),
        broadcasts: IndexMap::new(),
        blocks: BlockStore::new(),
        comments: IndexMap::new(),
        current_costume: 0,
        costumes: vec![Costume::new("backdrop1", STAGE_BACKDROP_ASSET_HASH)],
        sounds: Vec::new(),
        volume: 100.0,
        layer_order: 0,
        tempo: Some(60.0),
        video_transparency: Some(50.0),
        video_state: Some("on".to_string()),
        text_to_speech_language: Some(None),
        visible: None,
        x: None,
        y: None,
        size: None,
        direction: None,
        draggable: None,
        rotation_style: None,
    };

    let sprite = Target {
        is_stage: false,
        name: "Sprite1".to_string(),
        variables,
        lists,
        broadcasts: IndexMap::new(),
        blocks: lowered.blocks,
        comments: IndexMap::new(),
        current_costume: 0,
        costumes: vec![Costume::new("costume1", SPRITE_COSTUME_ASSET_HASH)],
        sounds: Vec::new(),
        volume: 100.0,
        layer_order: 1,
        tempo: None,
        video_transparency: None,
        video_state: None,
        text_to_speech_language: None,
        visible: Some(visible),
        x: Some(0.0),
        y: Some(0.0),
        size: Some(100.0),
        direction: Some(90.0),
        draggable: Some(false),
        rotation_style: Some("all around".to_string()),
    };

    ProjectEnvelope {
        targets: vec![stage, sprite],
        monitors: Vec::new(),
        extensions: Vec::new(),
        meta: Meta {
            semver: "3.0.0".to_string(),
            vm: "0.2.0".to_string(),
            agent: "scratchc".to_string(),
        },
    }
}
