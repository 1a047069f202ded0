// Copyright 2021 Michael Rodler
// This file is part of abimutator.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The contract interface model: function signatures parsed from the JSON interface and the
//! encoding of constructor and function calls.

use serde::Deserialize;

use crate::config::LayoutConfig;
use crate::encoder::encode_tuple;
use crate::error::{AbiError, Result};
use crate::layout::TestCase;
use crate::types::{ArgValue, TypeDescriptor};

/// One callable entry of the interface. An empty name denotes the constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    pub name: String,
    /// parameters in declaration order
    pub params: Vec<TypeDescriptor>,
}

impl FunctionSignature {
    pub fn new(name: String, params: Vec<TypeDescriptor>) -> FunctionSignature {
        FunctionSignature { name, params }
    }

    #[inline]
    pub fn is_constructor(&self) -> bool {
        self.name.is_empty()
    }

    /// `name(type1,type2,...)` over the canonical type names
    pub fn signature(&self) -> String {
        let types = self
            .params
            .iter()
            .map(|p| p.canonical_name.as_str())
            .collect::<Vec<&str>>()
            .join(",");
        format!("{}({})", self.name, types)
    }

    fn canonical_types(&self) -> Vec<&str> {
        self.params
            .iter()
            .map(|p| p.canonical_name.as_str())
            .collect()
    }

    pub fn selector(&self) -> [u8; 4] {
        crate::utils::selector(&self.name, &self.canonical_types())
    }

    pub fn short_signature(&self) -> u32 {
        crate::utils::short_signature(&self.name, &self.canonical_types())
    }

    /// ethabi parameter types, e.g. for decoding call data with a reference decoder
    pub fn param_types(&self) -> std::result::Result<Vec<ethabi::ParamType>, ethabi::Error> {
        self.params.iter().map(TypeDescriptor::param_type).collect()
    }

    /// The encoded argument tuple.
    pub fn encode_arguments(&self, values: &[ArgValue]) -> Result<Vec<u8>> {
        if values.len() != self.params.len() {
            return Err(AbiError::ArgumentCount {
                function: self.signature(),
                expected: self.params.len(),
                actual: values.len(),
            });
        }
        let params: Vec<(&TypeDescriptor, &ArgValue)> = self.params.iter().zip(values).collect();
        encode_tuple(&params)
    }

    /// Selector followed by the encoded argument tuple.
    pub fn encode_call(&self, values: &[ArgValue]) -> Result<Vec<u8>> {
        let args = self.encode_arguments(values)?;
        let mut ret = Vec::with_capacity(4 + args.len());
        ret.extend_from_slice(&self.selector());
        ret.extend(args);
        Ok(ret)
    }
}

#[derive(Deserialize)]
struct InterfaceInput {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct InterfaceEntry {
    #[serde(rename = "type")]
    kind: Option<String>,
    name: Option<String>,
    inputs: Option<Vec<InterfaceInput>>,
}

/// entry types that are not called with ABI encoded arguments; `event` and `error` inputs
/// describe logs and revert data
const NON_CALLABLE_ENTRIES: [&str; 4] = ["fallback", "receive", "event", "error"];

/// The parsed interface of one target contract. Read-only after construction, so it can be
/// shared between workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiModel {
    functions: Vec<FunctionSignature>,
    layout: LayoutConfig,
}

impl AbiModel {
    pub fn new(functions: Vec<FunctionSignature>) -> AbiModel {
        AbiModel {
            functions,
            layout: LayoutConfig::default(),
        }
    }

    /// Parse a JSON interface description; document order is kept.
    pub fn parse(json: &str) -> Result<AbiModel> {
        let entries: Vec<InterfaceEntry> = serde_json::from_str(json)?;
        let mut functions = Vec::with_capacity(entries.len());
        let mut have_constructor = false;

        for (idx, entry) in entries.into_iter().enumerate() {
            let kind = entry.kind.ok_or_else(|| {
                AbiError::InterfaceParse(format!("entry {} has no `type` field", idx))
            })?;
            if NON_CALLABLE_ENTRIES.contains(&kind.as_str()) {
                tracing::trace!(idx, kind = %kind, "skipping non-callable interface entry");
                continue;
            }

            let name = if kind == "constructor" {
                if have_constructor {
                    return Err(AbiError::InterfaceParse(format!(
                        "entry {} is a second constructor",
                        idx
                    )));
                }
                have_constructor = true;
                String::new()
            } else {
                entry.name.ok_or_else(|| {
                    AbiError::InterfaceParse(format!("{} entry {} has no `name` field", kind, idx))
                })?
            };

            let inputs = entry.inputs.ok_or_else(|| {
                AbiError::InterfaceParse(format!("entry {} has no `inputs` field", idx))
            })?;
            let params = inputs
                .into_iter()
                .enumerate()
                .map(|(pidx, input)| {
                    input
                        .kind
                        .map(|t| TypeDescriptor::classify(&t))
                        .ok_or_else(|| {
                            AbiError::InterfaceParse(format!(
                                "input {} of entry {} has no `type` field",
                                pidx, idx
                            ))
                        })
                })
                .collect::<Result<Vec<TypeDescriptor>>>()?;

            functions.push(FunctionSignature::new(name, params));
        }

        let model = AbiModel::new(functions);
        let testcase_len = model.testcase_len()?;
        tracing::debug!(
            functions = model.functions.len(),
            constructor = have_constructor,
            testcase_len,
            "parsed contract interface"
        );
        Ok(model)
    }

    /// Parse the interface stored in a file.
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<AbiModel> {
        use anyhow::Context;

        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ABI definition from file {}", path.display()))?;
        let model = AbiModel::parse(&json)
            .with_context(|| format!("failed to load ABI definition from file {}", path.display()))?;
        Ok(model)
    }

    /// Replace the flat buffer layout used by [`AbiModel::absorb_mutated_buffer`].
    pub fn with_layout(mut self, layout: LayoutConfig) -> AbiModel {
        self.layout = layout;
        self
    }

    #[inline]
    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// all entries including the constructor, in document order
    #[inline]
    pub fn functions(&self) -> &[FunctionSignature] {
        &self.functions
    }

    pub fn constructor(&self) -> Option<&FunctionSignature> {
        self.functions.iter().find(|f| f.is_constructor())
    }

    /// Find the named function whose selector matches `sig`.
    pub fn function_for_selector(&self, sig: u32) -> Option<&FunctionSignature> {
        self.functions
            .iter()
            .filter(|f| !f.is_constructor())
            .find(|f| f.short_signature() == sig)
    }

    fn check_testcase(&self, testcase: &TestCase) -> Result<()> {
        if testcase.args.len() != self.functions.len() {
            return Err(AbiError::ArgumentCount {
                function: "<testcase>".to_string(),
                expected: self.functions.len(),
                actual: testcase.args.len(),
            });
        }
        Ok(())
    }

    /// Encoded constructor arguments, or no bytes if the interface declares no constructor.
    pub fn encode_constructor(&self, testcase: &TestCase) -> Result<Vec<u8>> {
        self.check_testcase(testcase)?;
        match self.functions.iter().position(|f| f.is_constructor()) {
            Some(idx) => self.functions[idx].encode_arguments(&testcase.args[idx]),
            None => Ok(vec![]),
        }
    }

    /// One `selector ++ arguments` call per named function, in document order.
    pub fn encode_functions(&self, testcase: &TestCase) -> Result<Vec<Vec<u8>>> {
        self.check_testcase(testcase)?;
        self.functions
            .iter()
            .zip(testcase.args.iter())
            .filter(|(f, _)| !f.is_constructor())
            .map(|(f, values)| f.encode_call(values))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn parse_keeps_document_order() {
        let model = AbiModel::parse(TOKEN_ABI).unwrap();
        let names: Vec<&str> = model.functions().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["", "transfer", "approve", "balanceOf"]);
        let ctor = model.constructor().unwrap();
        assert_eq!(ctor.params.len(), 2);
        assert_eq!(ctor.params[0].canonical_name, "string");
        assert_eq!(model.functions()[1].signature(), "transfer(address,uint256)");
    }

    #[test]
    fn parse_skips_fallback_and_receive() {
        let model = AbiModel::parse(CROWDSALE_ABI).unwrap();
        assert!(model.functions().iter().all(|f| f.name != "fallback"));
        assert_eq!(model.functions().len(), 7);
        assert!(model.constructor().unwrap().params.is_empty());
    }

    #[test]
    fn parse_skips_events_and_errors() {
        let abi = r#"[
            {"type": "event", "name": "Transfer", "anonymous": false, "inputs": [
                {"name": "from", "type": "address", "indexed": true},
                {"name": "value", "type": "uint256", "indexed": false}]},
            {"type": "function", "name": "set", "inputs": [{"name": "x", "type": "uint256"}]},
            {"type": "error", "name": "Unauthorized", "inputs": [{"name": "who", "type": "address"}]}
        ]"#;
        let model = AbiModel::parse(abi).unwrap();
        assert_eq!(model.functions().len(), 1);
        assert_eq!(model.functions()[0].signature(), "set(uint256)");
        assert!(model
            .functions()
            .iter()
            .all(|f| f.name != "Transfer" && f.name != "Unauthorized"));
        assert_eq!(model.testcase_len().unwrap(), 32);
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            AbiModel::parse("[{"),
            Err(AbiError::InterfaceParse(_))
        ));
        assert!(matches!(
            AbiModel::parse(r#"[{"type": "function", "name": "f"}]"#),
            Err(AbiError::InterfaceParse(_))
        ));
        assert!(matches!(
            AbiModel::parse(r#"[{"name": "f", "inputs": []}]"#),
            Err(AbiError::InterfaceParse(_))
        ));
        assert!(matches!(
            AbiModel::parse(r#"[{"type": "function", "inputs": []}]"#),
            Err(AbiError::InterfaceParse(_))
        ));
        assert!(matches!(
            AbiModel::parse(r#"[{"type": "function", "name": "f", "inputs": [{"name": "x"}]}]"#),
            Err(AbiError::InterfaceParse(_))
        ));
        assert!(matches!(
            AbiModel::parse(
                r#"[{"type": "constructor", "inputs": []}, {"type": "constructor", "inputs": []}]"#
            ),
            Err(AbiError::InterfaceParse(_))
        ));
        assert!(matches!(
            AbiModel::parse(r#"{"type": "function"}"#),
            Err(AbiError::InterfaceParse(_))
        ));
    }

    #[test]
    fn selector_lookup() {
        let model = AbiModel::parse(TOKEN_ABI).unwrap();
        let f = model.function_for_selector(0xa9059cbb).unwrap();
        assert_eq!(f.name, "transfer");
        assert_eq!(f.selector(), [0xa9, 0x05, 0x9c, 0xbb]);
        assert!(model.function_for_selector(0xdeadbeef).is_none());
    }

    #[test]
    fn argument_count_is_checked() {
        let model = AbiModel::parse(TOKEN_ABI).unwrap();
        let transfer = &model.functions()[1];
        assert!(matches!(
            transfer.encode_call(&[]),
            Err(AbiError::ArgumentCount {
                expected: 2,
                actual: 0,
                ..
            })
        ));
        let empty = TestCase { args: vec![] };
        assert!(model.encode_functions(&empty).is_err());
    }

    #[test]
    fn constructor_missing() {
        let model = AbiModel::parse(SET_ABI).unwrap();
        assert!(model.constructor().is_none());
        let tc = model
            .absorb_mutated_buffer(&model.default_testcase().unwrap())
            .unwrap();
        assert!(model.encode_constructor(&tc).unwrap().is_empty());
    }
}
