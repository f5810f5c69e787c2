//! Package graph and toolchain doubles.

use std::path::PathBuf;

use crate::host::{HostError, PackageGraph, ProductDescription, Toolchain};

/// Package graph double with a fixed product list.
#[derive(Debug, Clone, Default)]
pub struct MockPackageGraph {
    products: Vec<ProductDescription>,
}

impl MockPackageGraph {
    pub fn new(products: Vec<ProductDescription>) -> Self {
        Self { products }
    }
}

impl PackageGraph for MockPackageGraph {
    fn root_products(&self) -> Vec<ProductDescription> {
        self.products.clone()
    }
}

/// Toolchain double resolving fixed tool paths.
#[derive(Debug, Clone)]
pub struct MockToolchain {
    pub merge_tool: PathBuf,
    pub export_tool: PathBuf,
    pub extractor: PathBuf,
}

impl Default for MockToolchain {
    fn default() -> Self {
        Self {
            merge_tool: PathBuf::from("/toolchain/bin/llvm-profdata"),
            export_tool: PathBuf::from("/toolchain/bin/llvm-cov"),
            extractor: PathBuf::from("/toolchain/bin/symbol-graph-extract"),
        }
    }
}

impl MockToolchain {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Toolchain for MockToolchain {
    fn coverage_merge_tool(&self) -> Result<PathBuf, HostError> {
        Ok(self.merge_tool.clone())
    }

    fn coverage_export_tool(&self) -> Result<PathBuf, HostError> {
        Ok(self.export_tool.clone())
    }

    fn symbol_graph_extractor(&self) -> Result<PathBuf, HostError> {
        Ok(self.extractor.clone())
    }
}
