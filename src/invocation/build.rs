//! Translation of plugin build requests into host builds.

use tracing::debug;

use keel_plugin_protocol::{
    ArtifactKind, BuildConfiguration, BuildLogVerbosity, BuildRequest, BuildResult, BuildSubset,
    BuiltArtifact,
};

use crate::host::{
    BuildParameters, BuildSubsetSpec, Configuration, LibraryKind, ProductDescription, ProductType,
    Severity,
};
use crate::invocation::{InvocationError, RequestContext};

const BUILD_TARGET: &str = "keel_plugin_host::invocation::build";

/// Maps a plugin build request onto host build configuration, runs the
/// build, and collects the built artifacts.
pub(crate) struct BuildRequestTranslator<'a> {
    context: &'a RequestContext,
}

impl<'a> BuildRequestTranslator<'a> {
    pub(crate) fn new(context: &'a RequestContext) -> Self {
        Self { context }
    }

    pub(crate) fn run(self, request: &BuildRequest) -> Result<BuildResult, InvocationError> {
        let mut parameters = self.context.host.build_parameters.clone();

        // Override the configuration only when the request names one.
        match request.configuration {
            BuildConfiguration::Debug => parameters.configuration = Configuration::Debug,
            BuildConfiguration::Release => parameters.configuration = Configuration::Release,
            BuildConfiguration::Inherit => {}
        }

        // Extra flags append after the host's own flags, per tool.
        parameters.flags.c.extend(request.extra_c_flags.iter().cloned());
        parameters
            .flags
            .cxx
            .extend(request.extra_cxx_flags.iter().cloned());
        parameters
            .flags
            .swift
            .extend(request.extra_swift_flags.iter().cloned());
        parameters
            .flags
            .linker
            .extend(request.extra_linker_flags.iter().cloned());

        parameters.log_level = severity_for(request.verbosity);

        let subset = resolve_subset(&request.subset, &mut parameters);

        let (tee, capture) = self.context.build_output(request.echo_logs);
        let mut build_system =
            self.context
                .host
                .build_system
                .create(parameters.clone(), false, Box::new(tee))?;

        debug!(
            target: BUILD_TARGET,
            request_id = %self.context.request_id,
            subset = ?subset,
            "running plugin build"
        );

        // A failed build is an expected, reportable outcome.
        let output = build_system.build(&subset, &[])?;

        let artifacts = collect_artifacts(
            &self.context.host.package_graph.root_products(),
            &parameters,
            &subset,
        );

        Ok(BuildResult {
            succeeded: output.succeeded,
            log_text: capture.contents(),
            artifacts,
        })
    }
}

/// Map the requested log verbosity onto a build-system severity threshold.
fn severity_for(verbosity: BuildLogVerbosity) -> Severity {
    match verbosity {
        BuildLogVerbosity::Concise => Severity::Warning,
        BuildLogVerbosity::Verbose => Severity::Info,
        BuildLogVerbosity::Debug => Severity::Debug,
    }
}

/// Resolve the plugin subset into host form, adjusting parameters where the
/// subset demands it.
fn resolve_subset(subset: &BuildSubset, parameters: &mut BuildParameters) -> BuildSubsetSpec {
    match subset {
        BuildSubset::All { including_tests } => {
            if *including_tests {
                // Test products only build when testability is explicit.
                parameters.explicit_testability = true;
                BuildSubsetSpec::AllIncludingTests
            } else {
                BuildSubsetSpec::AllExcludingTests
            }
        }
        BuildSubset::Product { name } => {
            parameters.explicit_product = Some(name.clone());
            BuildSubsetSpec::Product(name.clone())
        }
        BuildSubset::Target { name } => BuildSubsetSpec::Target(name.clone()),
    }
}

/// Walk the root packages' declared products, filter by subset, and
/// classify the survivors into artifacts.
fn collect_artifacts(
    products: &[ProductDescription],
    parameters: &BuildParameters,
    subset: &BuildSubsetSpec,
) -> Vec<BuiltArtifact> {
    products
        .iter()
        .filter(|product| selected(subset, product))
        .filter_map(|product| classify(parameters, product))
        .collect()
}

fn selected(subset: &BuildSubsetSpec, product: &ProductDescription) -> bool {
    match subset {
        BuildSubsetSpec::AllIncludingTests => true,
        BuildSubsetSpec::AllExcludingTests => product.product_type != ProductType::Test,
        BuildSubsetSpec::Product(name) | BuildSubsetSpec::Target(name) => product.name == *name,
    }
}

/// Classify a product into a built artifact by its type.
///
/// Products of unrecognized type are dropped from the artifact list
/// without error.
fn classify(parameters: &BuildParameters, product: &ProductDescription) -> Option<BuiltArtifact> {
    let (file_name, kind) = match product.product_type {
        ProductType::Executable => (product.name.clone(), ArtifactKind::Executable),
        ProductType::Test => (format!("{}.xctest", product.name), ArtifactKind::Executable),
        ProductType::Library(LibraryKind::Dynamic) => (
            format!("lib{}.dylib", product.name),
            ArtifactKind::DynamicLibrary,
        ),
        ProductType::Library(_) => {
            (format!("lib{}.a", product.name), ArtifactKind::StaticLibrary)
        }
        ProductType::Plugin | ProductType::Snippet | ProductType::Macro => return None,
    };
    Some(BuiltArtifact {
        path: parameters.configuration_dir().join(file_name),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, product_type: ProductType) -> ProductDescription {
        ProductDescription {
            name: name.to_string(),
            package_identity: "pkg".to_string(),
            product_type,
        }
    }

    #[test]
    fn verbosity_maps_to_severity_threshold() {
        assert_eq!(severity_for(BuildLogVerbosity::Concise), Severity::Warning);
        assert_eq!(severity_for(BuildLogVerbosity::Verbose), Severity::Info);
        assert_eq!(severity_for(BuildLogVerbosity::Debug), Severity::Debug);
    }

    #[test]
    fn all_without_tests_excludes_test_products() {
        let subset = BuildSubsetSpec::AllExcludingTests;
        assert!(selected(&subset, &product("App", ProductType::Executable)));
        assert!(!selected(&subset, &product("AppTests", ProductType::Test)));

        let subset = BuildSubsetSpec::AllIncludingTests;
        assert!(selected(&subset, &product("AppTests", ProductType::Test)));
    }

    #[test]
    fn named_subsets_keep_exact_matches_only() {
        let subset = BuildSubsetSpec::Product("App".to_string());
        assert!(selected(&subset, &product("App", ProductType::Executable)));
        assert!(!selected(&subset, &product("App2", ProductType::Executable)));
    }

    #[test]
    fn classification_is_total_over_recognized_types() {
        let parameters = BuildParameters::new("/b");

        let executable = classify(&parameters, &product("App", ProductType::Executable)).unwrap();
        assert_eq!(executable.kind, ArtifactKind::Executable);
        assert!(executable.path.ends_with("debug/App"));

        let dynamic = classify(
            &parameters,
            &product("Lib", ProductType::Library(LibraryKind::Dynamic)),
        )
        .unwrap();
        assert_eq!(dynamic.kind, ArtifactKind::DynamicLibrary);
        assert!(dynamic.path.ends_with("debug/libLib.dylib"));

        let automatic = classify(
            &parameters,
            &product("Lib", ProductType::Library(LibraryKind::Automatic)),
        )
        .unwrap();
        assert_eq!(automatic.kind, ArtifactKind::StaticLibrary);
        assert!(automatic.path.ends_with("debug/libLib.a"));
    }

    #[test]
    fn unrecognized_product_types_drop_without_error() {
        let parameters = BuildParameters::new("/b");
        assert!(classify(&parameters, &product("Gen", ProductType::Plugin)).is_none());
        assert!(classify(&parameters, &product("Snip", ProductType::Snippet)).is_none());
        assert!(classify(&parameters, &product("Mac", ProductType::Macro)).is_none());
    }

    #[test]
    fn subset_resolution_adjusts_parameters() {
        let mut parameters = BuildParameters::new("/b");
        let resolved = resolve_subset(
            &BuildSubset::All {
                including_tests: true,
            },
            &mut parameters,
        );
        assert_eq!(resolved, BuildSubsetSpec::AllIncludingTests);
        assert!(parameters.explicit_testability);

        let mut parameters = BuildParameters::new("/b");
        let resolved = resolve_subset(
            &BuildSubset::Product {
                name: "Foo".to_string(),
            },
            &mut parameters,
        );
        assert_eq!(resolved, BuildSubsetSpec::Product("Foo".to_string()));
        assert_eq!(parameters.explicit_product.as_deref(), Some("Foo"));
    }
}
