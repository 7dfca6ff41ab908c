//! Script objects
//!
//! A [`ScriptObject`] is an ordered list of script descriptors attached to
//! an entity. The library only drives their lifecycle; running the scripts
//! is the job of a [`ScriptHost`].

use std::collections::BTreeMap;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use void_ecs::Entity;

use crate::error::ScriptError;
use crate::scene::Scene;

/// Typed property value handed to a script
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ScriptValue {
    Bool(bool),
    Number(f64),
    String(String),
}

/// Property table of one script, stored as an opaque blob on its descriptor
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptProperties {
    values: BTreeMap<String, ScriptValue>,
}

impl ScriptProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: ScriptValue) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: ScriptValue) -> Option<ScriptValue> {
        self.values.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&ScriptValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScriptValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn encode(&self) -> Result<Vec<u8>, ScriptError> {
        bincode::serialize(self).map_err(|e| ScriptError::Properties(e.to_string()))
    }

    /// Decode a property blob; an empty blob is an empty table
    pub fn decode(bytes: &[u8]) -> Result<Self, ScriptError> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        bincode::deserialize(bytes).map_err(|e| ScriptError::Properties(e.to_string()))
    }
}

/// One script: its file and encoded properties
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptDescriptor {
    pub file: String,
    pub properties: Vec<u8>,
}

impl ScriptDescriptor {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_properties(mut self, properties: &ScriptProperties) -> Result<Self, ScriptError> {
        self.properties = properties.encode()?;
        Ok(self)
    }

    pub fn decode_properties(&self) -> Result<ScriptProperties, ScriptError> {
        ScriptProperties::decode(&self.properties)
    }
}

/// Runs scripts on behalf of the library
pub trait ScriptHost: Send + Sync {
    fn init_script(&self, entity: Entity, script: &ScriptDescriptor) -> Result<(), ScriptError>;
    fn unload_script(&self, entity: Entity, script: &ScriptDescriptor);
}

/// Host that only logs lifecycle calls
#[derive(Debug, Default)]
pub struct LoggingScriptHost;

impl ScriptHost for LoggingScriptHost {
    fn init_script(&self, entity: Entity, script: &ScriptDescriptor) -> Result<(), ScriptError> {
        let properties = script.decode_properties()?;
        info!(
            "Script {} started on {} ({} properties)",
            script.file,
            entity,
            properties.len()
        );
        Ok(())
    }

    fn unload_script(&self, entity: Entity, script: &ScriptDescriptor) {
        info!("Script {} stopped on {}", script.file, entity);
    }
}

/// Ordered scripts of one entity.
///
/// Persisted as the list of descriptors; `initialized` is runtime state.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScriptObject {
    pub scripts: Vec<ScriptDescriptor>,
    #[serde(skip)]
    pub(crate) initialized: bool,
}

impl ScriptObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, script: ScriptDescriptor) -> Self {
        self.scripts.push(script);
        self
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Start every script once. A failing script is logged and skipped.
    pub fn init(&mut self, entity: Entity, host: &dyn ScriptHost) {
        if self.initialized {
            return;
        }
        for script in &self.scripts {
            if let Err(e) = host.init_script(entity, script) {
                error!("Script {} on {} failed to start: {}", script.file, entity, e);
            }
        }
        self.initialized = true;
    }

    /// Stop every script; no-op when not initialized
    pub fn unload(&mut self, entity: Entity, host: &dyn ScriptHost) {
        if !self.initialized {
            return;
        }
        for script in &self.scripts {
            host.unload_script(entity, script);
        }
        self.initialized = false;
    }
}

impl Scene {
    /// Attach a fresh script object to `entity`, with one script when `file`
    /// is non-empty, or tear down and remove the existing one.
    pub fn set_script(&mut self, entity: Entity, set: bool, file: &str) {
        if let Some(mut previous) = self.scripts.remove(entity) {
            previous.unload(entity, self.script_host.as_ref());
        }
        if set {
            let mut object = ScriptObject::new();
            if !file.is_empty() {
                object.scripts.push(ScriptDescriptor::new(file));
            }
            self.scripts.insert(entity, object);
            debug!("Script object set on {}", entity);
        }
    }

    pub fn script_object(&self, entity: Entity) -> Option<&ScriptObject> {
        self.scripts.get(entity)
    }

    /// Start the script object on `entity` if it has not started yet
    pub(crate) fn init_script_object(&mut self, entity: Entity) {
        if let Some(object) = self.scripts.get_mut(entity) {
            object.init(entity, self.script_host.as_ref());
        }
    }

    pub(crate) fn unload_script_object(&mut self, entity: Entity) {
        if let Some(object) = self.scripts.get_mut(entity) {
            object.unload(entity, self.script_host.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl ScriptHost for Recorder {
        fn init_script(&self, _entity: Entity, script: &ScriptDescriptor) -> Result<(), ScriptError> {
            self.calls.lock().push(format!("init {}", script.file));
            if script.file == "broken.lua" {
                return Err(ScriptError::NotFound(script.file.clone()));
            }
            Ok(())
        }

        fn unload_script(&self, _entity: Entity, script: &ScriptDescriptor) {
            self.calls.lock().push(format!("unload {}", script.file));
        }
    }

    #[test]
    fn test_properties_codec() {
        let properties = ScriptProperties::new()
            .with("speed", ScriptValue::Number(2.5))
            .with("hostile", ScriptValue::Bool(true))
            .with("greeting", ScriptValue::String("hello".into()));

        let descriptor = ScriptDescriptor::new("npc.lua").with_properties(&properties).unwrap();
        let decoded = descriptor.decode_properties().unwrap();
        assert_eq!(decoded, properties);
        assert_eq!(decoded.get("speed"), Some(&ScriptValue::Number(2.5)));

        assert!(ScriptProperties::decode(&[]).unwrap().is_empty());
        assert!(ScriptProperties::decode(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn test_object_lifecycle() {
        let host = Recorder::default();
        let entity = Entity::new(1, 0);
        let mut object = ScriptObject::new()
            .with_script(ScriptDescriptor::new("a.lua"))
            .with_script(ScriptDescriptor::new("broken.lua"));

        object.init(entity, &host);
        object.init(entity, &host);
        assert!(object.is_initialized());

        object.unload(entity, &host);
        object.unload(entity, &host);
        assert!(!object.is_initialized());

        assert_eq!(
            *host.calls.lock(),
            vec!["init a.lua", "init broken.lua", "unload a.lua", "unload broken.lua"]
        );
    }

    #[test]
    fn test_persisted_as_descriptor_list() {
        let mut object = ScriptObject::new().with_script(ScriptDescriptor::new("a.lua"));
        object.initialized = true;

        let bytes = bincode::serialize(&object).unwrap();
        let scripts: Vec<ScriptDescriptor> = bincode::deserialize(&bytes).unwrap();
        assert_eq!(scripts, object.scripts);

        let restored: ScriptObject = bincode::deserialize(&bytes).unwrap();
        assert!(!restored.is_initialized());
    }
}
