//! Request/response envelopes for the plugin↔host wire.
//!
//! A sandboxed plugin writes one [`InvocationRequest`] per operation and
//! receives one [`InvocationResponse`]; the `op`/`result` tags discriminate
//! the payloads.

use serde::{Deserialize, Serialize};

use crate::build::{BuildRequest, BuildResult};
use crate::symbols::{SymbolGraphRequest, SymbolGraphResult};
use crate::test::{TestRequest, TestResult};

/// A plugin-originated request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum InvocationRequest {
    Build(BuildRequest),
    Test(TestRequest),
    SymbolGraph(SymbolGraphRequest),
}

/// A host-originated response envelope.
///
/// `Failure` carries hard failures (configuration errors, tool failures);
/// expected build/test failures travel inside the success payloads with
/// `succeeded = false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum InvocationResponse {
    Build(BuildResult),
    Test(TestResult),
    SymbolGraph(SymbolGraphResult),
    Failure { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{BuildConfiguration, BuildSubset};
    use crate::test::TestSubset;

    #[test]
    fn request_envelope_round_trips() {
        let request = InvocationRequest::Build(BuildRequest {
            subset: BuildSubset::Product {
                name: "Tool".to_string(),
            },
            configuration: BuildConfiguration::Release,
            extra_c_flags: vec![],
            extra_cxx_flags: vec![],
            extra_swift_flags: vec!["-DFEATURE".to_string()],
            extra_linker_flags: vec![],
            verbosity: Default::default(),
            echo_logs: true,
        });
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""op":"build""#));
        let back: InvocationRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, back);
    }

    #[test]
    fn test_request_envelope_tags_op() {
        let request = InvocationRequest::Test(TestRequest {
            subset: TestSubset::All,
            enable_code_coverage: false,
        });
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["op"], "test");
    }

    #[test]
    fn failure_response_round_trips() {
        let response = InvocationResponse::Failure {
            message: "no build description found for module 'Nope'".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        let back: InvocationResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(response, back);
    }
}
