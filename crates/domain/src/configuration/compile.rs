use crate::environment::ConfigEnvironment;
use crate::keys::{ConfigKeyAction, KeyStore};
use crate::layer::EnvironmentLayer;
use crate::structure::ConfigStructure;

/// Compiles the effective keys of an environment for a structure.
///
/// Structure keys are overlaid by each layer in the order given, then by
/// the environment's own keys. Paths compare case-insensitively, so the
/// last source to set a key decides both value and spelling.
pub fn compile_keys(
    structure: &ConfigStructure,
    layers: &[EnvironmentLayer],
    environment: &ConfigEnvironment,
) -> Vec<ConfigKeyAction> {
    let mut compiled = KeyStore::new();
    for key in structure.keys().iter() {
        compiled.set(key.clone());
    }
    for layer in layers {
        for key in layer.keys().iter() {
            compiled.set(key.clone());
        }
    }
    for key in environment.keys().iter() {
        compiled.set(key.clone());
    }
    compiled.to_actions()
}
