use crate::types::ToolCall;
use std::collections::BTreeMap;

/// Merges streamed tool-call fragments into complete calls.
///
/// Fragments are grouped by `index` (missing index means 0). Name and
/// argument text are appended in arrival order; `id` and `type` keep the first
/// non-empty value seen.
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    calls: BTreeMap<u32, ToolCall>,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &ToolCall) {
        let index = fragment.index.unwrap_or(0);
        let slot = self.calls.entry(index).or_insert_with(|| ToolCall {
            index: Some(index),
            ..ToolCall::default()
        });

        if slot.id.is_empty() && !fragment.id.is_empty() {
            slot.id = fragment.id.clone();
        }
        if slot.call_type.is_empty() && !fragment.call_type.is_empty() {
            slot.call_type = fragment.call_type.clone();
        }
        slot.function.name.push_str(&fragment.function.name);
        slot.function.arguments.push_str(&fragment.function.arguments);
    }

    pub fn extend<'a>(&mut self, fragments: impl IntoIterator<Item = &'a ToolCall>) {
        for fragment in fragments {
            self.push(fragment);
        }
    }

    /// Whether any fragment has been seen this round.
    pub fn has_fragments(&self) -> bool {
        !self.calls.is_empty()
    }

    /// Complete calls ordered by index. Incomplete ones are dropped with a warning.
    pub fn finalize(self) -> Vec<ToolCall> {
        self.calls
            .into_values()
            .filter(|call| {
                let complete = call.is_complete();
                if !complete {
                    tracing::warn!(
                        index = call.index.unwrap_or(0),
                        name = %call.function.name,
                        "dropping incomplete tool call"
                    );
                }
                complete
            })
            .map(|mut call| {
                if call.call_type.is_empty() {
                    call.call_type = "function".to_string();
                }
                call
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(index: Option<u32>, id: &str, name: &str, args: &str) -> ToolCall {
        ToolCall {
            index,
            id: id.to_string(),
            call_type: String::new(),
            function: crate::types::FunctionCall {
                name: name.to_string(),
                arguments: args.to_string(),
            },
        }
    }

    #[test]
    fn incomplete_call_is_dropped() {
        let mut asm = ToolCallAssembler::new();
        asm.push(&frag(Some(0), "", "a", ""));
        asm.push(&frag(Some(1), "", "b", ""));
        asm.push(&frag(Some(0), "", "", "1"));
        let calls = asm.finalize();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name(), "a");
        assert_eq!(calls[0].arguments(), "1");
    }

    #[test]
    fn first_id_wins_and_arguments_concatenate() {
        let mut asm = ToolCallAssembler::new();
        asm.extend(&[
            frag(None, "call_1", "queryJobs", "{\"job"),
            frag(None, "call_other", "ByArea", "Title\":\"Java\"}"),
        ]);
        let calls = asm.finalize();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name(), "queryJobsByArea");
        assert_eq!(calls[0].arguments(), "{\"jobTitle\":\"Java\"}");
        assert_eq!(calls[0].call_type, "function");
    }

    #[test]
    fn output_is_ordered_by_index() {
        let mut asm = ToolCallAssembler::new();
        asm.push(&frag(Some(2), "c2", "second", "{}"));
        asm.push(&frag(Some(0), "c0", "first", "{}"));
        let names: Vec<_> = asm.finalize().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, ["first", "second"]);
    }

    #[test]
    fn empty_assembler_yields_nothing() {
        let asm = ToolCallAssembler::new();
        assert!(!asm.has_fragments());
        assert!(asm.finalize().is_empty());
    }
}
