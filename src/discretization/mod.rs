pub mod generator;
pub mod medit;
pub mod mesh;
pub mod regions;
