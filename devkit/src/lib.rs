/*!
# Hostdeck DevKit - Stubs et Utilitaires pour les tests

Bibliothèque facilitant les tests de l'agent et de l'API sans toucher à l'hôte:
- Faux arbre noyau (`proc`/`sys`) dans un répertoire temporaire
- Runner de commandes scripté qui enregistre chaque invocation
*/

pub mod runner_stub;
pub mod test_utils;

pub use runner_stub::{Reply, ScriptedRunner};
pub use test_utils::{FakeKernelTree, FakeProcess};
