#![deny(unsafe_code)]

use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};

use hl7_model::{
    ComponentDefinition, DataTypeDefinition, FieldDefinition, FieldPath, MessageStructure,
    SegmentDefinition, TableDefinition, Usage, VendorOverlay,
};

use crate::error::DefinitionError;
use crate::hash::sha256_hex;
use crate::load;
use crate::manifest::{Manifest, ManifestFile, Pins};
use crate::vendor::parse_overlay;

const REQUIRED_ROLES: &[&str] = &[
    "segments",
    "fields",
    "data_types",
    "data_type_components",
    "tables",
    "table_values",
    "message_structures",
];

const VENDOR_ROLE_PREFIX: &str = "vendor_";

const ALLOWED_KINDS: &[&str] = &["csv", "toml"];

const MANIFEST_SCHEMA: &str = "hl7-workbench.standards-manifest";

#[derive(Debug, Clone, serde::Serialize)]
pub struct RegistrySummary {
    pub standards_dir: PathBuf,
    pub standard: String,
    pub version: String,
    pub file_count: usize,
    pub segment_count: usize,
    pub field_count: usize,
    pub data_type_count: usize,
    pub table_count: usize,
    pub structure_count: usize,
    pub vendor_count: usize,
}

/// The loaded definition corpus. Immutable after [`Registry::load`]; share
/// it behind an `Arc` and read it from any number of threads.
#[derive(Debug)]
pub struct Registry {
    standards_dir: PathBuf,
    pins: Pins,
    file_count: usize,
    segments: HashMap<String, SegmentDefinition>,
    segment_order: Vec<String>,
    data_types: HashMap<String, DataTypeDefinition>,
    tables: HashMap<String, TableDefinition>,
    structures: HashMap<String, MessageStructure>,
    vendors: HashMap<String, VendorOverlay>,
    /// Field-level path -> component definitions derived from the field's
    /// composite data type. Empty for primitive fields.
    components: HashMap<FieldPath, Vec<ComponentDefinition>>,
}

impl Registry {
    /// Load and fully validate a standards directory. Any broken
    /// cross-reference, duplicate definition, digest mismatch, or composite
    /// cycle fails the whole load.
    pub fn load(standards_dir: &Path) -> Result<Self, DefinitionError> {
        let manifest = load_manifest(&standards_dir.join("manifest.toml"))?;
        validate_manifest(&manifest, standards_dir)?;

        let mut files = manifest.files.clone();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        for file in &files {
            verify_file(standards_dir, file)?;
        }

        let segments = load::parse_segments(
            &resolve_role_path(standards_dir, &files, "segments")?,
            &resolve_role_path(standards_dir, &files, "fields")?,
        )?;
        let data_types = load::parse_data_types(
            &resolve_role_path(standards_dir, &files, "data_types")?,
            &resolve_role_path(standards_dir, &files, "data_type_components")?,
        )?;
        let tables = load::parse_tables(
            &resolve_role_path(standards_dir, &files, "tables")?,
            &resolve_role_path(standards_dir, &files, "table_values")?,
        )?;
        let structures =
            load::parse_structures(&resolve_role_path(standards_dir, &files, "message_structures")?)?;

        let mut vendors: HashMap<String, VendorOverlay> = HashMap::new();
        for file in &files {
            if !file.role.starts_with(VENDOR_ROLE_PREFIX) {
                continue;
            }
            let overlay = parse_overlay(&standards_dir.join(&file.path))?;
            if vendors.contains_key(&overlay.id) {
                return Err(DefinitionError::Duplicate {
                    kind: "vendor overlay",
                    key: overlay.id,
                });
            }
            vendors.insert(overlay.id.clone(), overlay);
        }

        let registry = Self::build(
            standards_dir.to_path_buf(),
            manifest.pins,
            files.len(),
            segments,
            data_types,
            tables,
            structures,
            vendors,
        )?;
        Ok(registry)
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        standards_dir: PathBuf,
        pins: Pins,
        file_count: usize,
        segments: Vec<SegmentDefinition>,
        data_types: Vec<DataTypeDefinition>,
        tables: Vec<TableDefinition>,
        structures: Vec<MessageStructure>,
        vendors: HashMap<String, VendorOverlay>,
    ) -> Result<Self, DefinitionError> {
        let data_types: HashMap<String, DataTypeDefinition> = data_types
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();
        let tables: HashMap<String, TableDefinition> =
            tables.into_iter().map(|t| (t.id.clone(), t)).collect();

        detect_composite_cycles(&data_types)?;

        let segment_order: Vec<String> = segments.iter().map(|s| s.code.clone()).collect();
        let segments: HashMap<String, SegmentDefinition> = segments
            .into_iter()
            .map(|s| (s.code.clone(), s))
            .collect();

        let mut structure_map: HashMap<String, MessageStructure> = HashMap::new();
        for structure in structures {
            if structure_map.contains_key(&structure.message_type) {
                return Err(DefinitionError::Duplicate {
                    kind: "message structure",
                    key: structure.message_type,
                });
            }
            structure_map.insert(structure.message_type.clone(), structure);
        }

        let mut registry = Self {
            standards_dir,
            pins,
            file_count,
            segments,
            segment_order,
            data_types,
            tables,
            structures: structure_map,
            vendors,
            components: HashMap::new(),
        };
        registry.build_component_index();
        registry.validate_cross_references()?;
        Ok(registry)
    }

    fn validate_cross_references(&self) -> Result<(), DefinitionError> {
        for data_type in self.data_types.values() {
            for component in &data_type.components {
                if !self.data_types.contains_key(&component.data_type) {
                    return Err(DefinitionError::DanglingReference {
                        from: format!("data type {} component {}", data_type.name, component.position),
                        kind: "data type",
                        to: component.data_type.clone(),
                    });
                }
                if let Some(table) = &component.table {
                    if !self.tables.contains_key(table) {
                        return Err(DefinitionError::DanglingReference {
                            from: format!(
                                "data type {} component {}",
                                data_type.name, component.position
                            ),
                            kind: "table",
                            to: table.clone(),
                        });
                    }
                }
            }
        }

        for segment in self.segments.values() {
            for field in &segment.fields {
                if !self.data_types.contains_key(&field.data_type) {
                    return Err(DefinitionError::DanglingReference {
                        from: field.path.to_string(),
                        kind: "data type",
                        to: field.data_type.clone(),
                    });
                }
                if let Some(table) = &field.table {
                    if !self.tables.contains_key(table) {
                        return Err(DefinitionError::DanglingReference {
                            from: field.path.to_string(),
                            kind: "table",
                            to: table.clone(),
                        });
                    }
                }
                if let Usage::Conditional(condition) = &field.usage {
                    if self.field(&condition.path.parent_field()).is_none() {
                        return Err(DefinitionError::DanglingReference {
                            from: format!("condition on {}", field.path),
                            kind: "field",
                            to: condition.path.to_string(),
                        });
                    }
                }
            }
        }

        for structure in self.structures.values() {
            for entry in &structure.entries {
                if !self.segments.contains_key(&entry.segment) {
                    return Err(DefinitionError::DanglingReference {
                        from: format!("structure {}", structure.message_type),
                        kind: "segment",
                        to: entry.segment.clone(),
                    });
                }
            }
        }

        for overlay in self.vendors.values() {
            for constraint in &overlay.constraints {
                if constraint.message_type != "*"
                    && !self.structures.contains_key(&constraint.message_type)
                {
                    return Err(DefinitionError::DanglingReference {
                        from: format!("vendor overlay {}", overlay.id),
                        kind: "message structure",
                        to: constraint.message_type.clone(),
                    });
                }
                let field_path = constraint.path.parent_field();
                let Some(field) = self.field(&field_path) else {
                    return Err(DefinitionError::DanglingReference {
                        from: format!("vendor overlay {}", overlay.id),
                        kind: "field",
                        to: constraint.path.to_string(),
                    });
                };
                let table = self.slot_table(field, constraint.path.component);
                if let Some(table) = table {
                    for value in constraint
                        .allowed
                        .iter()
                        .flatten()
                        .chain(constraint.fixed.iter())
                    {
                        if !table.contains(value) {
                            return Err(DefinitionError::InvalidRecord {
                                kind: "vendor constraint",
                                path: self.standards_dir.clone(),
                                message: format!(
                                    "overlay {}: value '{}' for {} is not in table {}",
                                    overlay.id, value, constraint.path, table.id
                                ),
                            });
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn build_component_index(&mut self) {
        let mut components: HashMap<FieldPath, Vec<ComponentDefinition>> = HashMap::new();
        for segment in self.segments.values() {
            for field in &segment.fields {
                // Dangling data types are caught by cross-reference
                // validation right after this index is built.
                let Some(data_type) = self.data_types.get(&field.data_type) else {
                    continue;
                };
                if !data_type.is_composite() {
                    continue;
                }
                let defs: Vec<ComponentDefinition> = data_type
                    .components
                    .iter()
                    .map(|c| ComponentDefinition {
                        path: FieldPath::component(
                            &field.path.segment,
                            field.path.field,
                            c.position,
                        ),
                        name: c.name.clone(),
                        data_type: c.data_type.clone(),
                        required: c.required,
                        table: c.table.clone(),
                    })
                    .collect();
                components.insert(field.path.clone(), defs);
            }
        }
        self.components = components;
    }

    /// Pinned release string of the loaded standard (e.g. `2.5.1`).
    pub fn version(&self) -> &str {
        &self.pins.version
    }

    pub fn segment(&self, code: &str) -> Option<&SegmentDefinition> {
        self.segments.get(code)
    }

    /// Segment codes in definition-file order; drives stable traversal for
    /// the diff engine and listings.
    pub fn segment_codes(&self) -> &[String] {
        &self.segment_order
    }

    pub fn field(&self, path: &FieldPath) -> Option<&FieldDefinition> {
        self.segments.get(&path.segment)?.field(path.field)
    }

    /// Component definitions for a field-level path; empty for primitives.
    pub fn components(&self, field_path: &FieldPath) -> &[ComponentDefinition] {
        self.components
            .get(&field_path.parent_field())
            .map_or(&[], Vec::as_slice)
    }

    /// Component definition at a `SEG.N.M` path.
    pub fn component(&self, path: &FieldPath) -> Option<&ComponentDefinition> {
        let position = path.component?;
        self.components
            .get(&path.parent_field())?
            .get(usize::from(position) - 1)
    }

    pub fn table(&self, id: &str) -> Option<&TableDefinition> {
        self.tables.get(id)
    }

    pub fn data_type(&self, name: &str) -> Option<&DataTypeDefinition> {
        self.data_types.get(name)
    }

    pub fn structure(&self, message_type: &str) -> Option<&MessageStructure> {
        self.structures.get(message_type)
    }

    pub fn message_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.structures.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn vendor(&self, id: &str) -> Option<&VendorOverlay> {
        self.vendors.get(id)
    }

    pub fn vendor_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.vendors.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// The table constraining a slot: the component's own table for
    /// component paths, otherwise the field's table (which, for composite
    /// fields, constrains the first component).
    pub fn slot_table(
        &self,
        field: &FieldDefinition,
        component: Option<u16>,
    ) -> Option<&TableDefinition> {
        match component {
            Some(position) => {
                let definition = self
                    .component(&FieldPath::component(
                        &field.path.segment,
                        field.path.field,
                        position,
                    ))?;
                if let Some(table) = &definition.table {
                    return self.table(table);
                }
                if position == 1 {
                    if let Some(table) = &field.table {
                        return self.table(table);
                    }
                }
                None
            }
            None => field.table.as_ref().and_then(|id| self.table(id)),
        }
    }

    pub fn summary(&self) -> RegistrySummary {
        RegistrySummary {
            standards_dir: self.standards_dir.clone(),
            standard: self.pins.standard.clone(),
            version: self.pins.version.clone(),
            file_count: self.file_count,
            segment_count: self.segments.len(),
            field_count: self.segments.values().map(|s| s.fields.len()).sum(),
            data_type_count: self.data_types.len(),
            table_count: self.tables.len(),
            structure_count: self.structures.len(),
            vendor_count: self.vendors.len(),
        }
    }
}

/// Reject composite definitions that reach themselves through their
/// component types. Generation builds composites bottom-up and must not
/// rely on a recursion limit.
fn detect_composite_cycles(
    data_types: &HashMap<String, DataTypeDefinition>,
) -> Result<(), DefinitionError> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Visiting,
        Done,
    }

    fn visit(
        name: &str,
        data_types: &HashMap<String, DataTypeDefinition>,
        states: &mut HashMap<String, State>,
        stack: &mut Vec<String>,
    ) -> Result<(), DefinitionError> {
        match states.get(name) {
            Some(State::Done) => return Ok(()),
            Some(State::Visiting) => {
                let mut chain: Vec<&str> = stack.iter().map(String::as_str).collect();
                chain.push(name);
                return Err(DefinitionError::CompositeCycle {
                    chain: chain.join(" -> "),
                });
            }
            None => {}
        }
        states.insert(name.to_string(), State::Visiting);
        stack.push(name.to_string());
        if let Some(definition) = data_types.get(name) {
            for component in &definition.components {
                if data_types.contains_key(&component.data_type) {
                    visit(&component.data_type, data_types, states, stack)?;
                }
            }
        }
        stack.pop();
        states.insert(name.to_string(), State::Done);
        Ok(())
    }

    let mut states = HashMap::new();
    let mut stack = Vec::new();
    let mut names: Vec<&String> = data_types.keys().collect();
    names.sort();
    for name in names {
        visit(name, data_types, &mut states, &mut stack)?;
    }
    Ok(())
}

fn load_manifest(path: &Path) -> Result<Manifest, DefinitionError> {
    let contents = std::fs::read_to_string(path).map_err(|e| DefinitionError::io(path, e))?;
    toml::from_str(&contents).map_err(|e| DefinitionError::Toml {
        path: path.to_path_buf(),
        source: e,
    })
}

fn validate_manifest(manifest: &Manifest, standards_dir: &Path) -> Result<(), DefinitionError> {
    if manifest.manifest.schema != MANIFEST_SCHEMA {
        return Err(DefinitionError::InvalidManifest {
            message: format!("unsupported schema: {}", manifest.manifest.schema),
        });
    }
    if manifest.manifest.schema_version != 1 {
        return Err(DefinitionError::InvalidManifest {
            message: format!(
                "unsupported schema_version: {}",
                manifest.manifest.schema_version
            ),
        });
    }

    let mut roles: BTreeSet<&str> = BTreeSet::new();
    let mut manifest_paths: BTreeSet<PathBuf> = BTreeSet::new();

    for file in &manifest.files {
        if roles.contains(file.role.as_str()) {
            return Err(DefinitionError::DuplicateRole {
                role: file.role.clone(),
            });
        }
        roles.insert(file.role.as_str());

        if !ALLOWED_KINDS.contains(&file.kind.as_str()) {
            return Err(DefinitionError::InvalidManifest {
                message: format!("unsupported kind '{}' for {}", file.kind, file.path),
            });
        }

        validate_sha(&file.sha256, &file.path)?;

        let path = validate_path(&file.path)?;
        manifest_paths.insert(path);
    }

    for role in REQUIRED_ROLES {
        if !roles.contains(role) {
            return Err(DefinitionError::MissingRole {
                role: (*role).to_string(),
            });
        }
    }

    let actual_files = list_files_under(standards_dir)?;
    for path in actual_files {
        if path == PathBuf::from("manifest.toml") {
            continue;
        }
        if !manifest_paths.contains(&path) {
            return Err(DefinitionError::UnexpectedFile {
                path: standards_dir.join(path),
            });
        }
    }

    Ok(())
}

fn verify_file(standards_dir: &Path, file: &ManifestFile) -> Result<(), DefinitionError> {
    let full_path = standards_dir.join(&file.path);
    let bytes = std::fs::read(&full_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DefinitionError::MissingFile {
                path: full_path.clone(),
            }
        } else {
            DefinitionError::io(full_path.clone(), e)
        }
    })?;

    let actual = sha256_hex(&bytes);
    let expected = file.sha256.to_ascii_lowercase();
    if actual != expected {
        return Err(DefinitionError::Sha256Mismatch {
            path: full_path,
            expected,
            actual,
        });
    }
    Ok(())
}

fn resolve_role_path(
    standards_dir: &Path,
    files: &[ManifestFile],
    role: &str,
) -> Result<PathBuf, DefinitionError> {
    let f = files
        .iter()
        .find(|f| f.role == role)
        .ok_or_else(|| DefinitionError::MissingRole {
            role: role.to_string(),
        })?;
    Ok(standards_dir.join(&f.path))
}

fn validate_sha(sha: &str, path: &str) -> Result<(), DefinitionError> {
    if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DefinitionError::InvalidSha256 {
            path: PathBuf::from(path),
            message: "sha256 must be 64 hex characters".to_string(),
        });
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<PathBuf, DefinitionError> {
    if path.contains('\\') {
        return Err(DefinitionError::InvalidPath {
            path: PathBuf::from(path),
            message: "manifest path must use '/' separators".to_string(),
        });
    }

    let p = PathBuf::from(path);
    if p.is_absolute() {
        return Err(DefinitionError::InvalidPath {
            path: p,
            message: "manifest path must be relative".to_string(),
        });
    }

    for c in p.components() {
        if matches!(c, Component::ParentDir | Component::CurDir) {
            return Err(DefinitionError::InvalidPath {
                path: PathBuf::from(path),
                message: "manifest path must not traverse out of the standards directory"
                    .to_string(),
            });
        }
    }

    Ok(p)
}

fn list_files_under(root: &Path) -> Result<BTreeSet<PathBuf>, DefinitionError> {
    let mut stack = vec![root.to_path_buf()];
    let mut files = BTreeSet::new();

    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).map_err(|e| DefinitionError::io(&dir, e))? {
            let entry = entry.map_err(|e| DefinitionError::io(&dir, e))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                let rel = path
                    .strip_prefix(root)
                    .map_err(|e| DefinitionError::InvalidPath {
                        path: path.clone(),
                        message: format!("failed to relativize path: {e}"),
                    })?
                    .to_path_buf();
                files.insert(rel);
            }
        }
    }

    Ok(files)
}
