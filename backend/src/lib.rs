//! Plant disease classification over HTTP: decode an uploaded leaf photo,
//! normalize it to the model's input tensor, run the TorchScript classifier
//! and answer with the most likely PlantVillage class.

pub mod config;
pub mod inference;
pub mod routes;
