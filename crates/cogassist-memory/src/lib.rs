mod working_memory;

pub use working_memory::{
    ContextItem, Hypothesis, MemoryState, ReasoningPass, WorkingMemory,
};
