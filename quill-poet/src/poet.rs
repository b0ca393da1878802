use crate::agent::{Agent, Task};
use crate::tool::HumanInputTool;

pub const FINAL_REPORT_PREFIX: &str = "FINAL REPORT: ";

pub fn poem_writer(human_input: HumanInputTool) -> Agent {
    Agent::new(
        "Creative Poet",
        "Craft an engaging poem based on user-provided words. \
         First, ask the user how many words (between 1 and 5) they want to rhyme around. \
         Then, ask for that many words before composing a final poem. \
         Send the final response to the user again.",
        "A master of rhythm and rhyme, you weave words into captivating poetry \
         that resonates with emotions and themes.",
    )
    .with_tool(human_input)
}

pub fn poetry_task() -> Task {
    Task::new(
        "Engage with the user to determine the number of words for the poem (max 5, min 1). \
         Then, gather the specified words one by one through an interactive Q&A process. \
         Once all words are collected, compose a creative and compelling poem around them.",
        "A beautifully crafted poem using the words provided by the user.",
    )
}

pub fn final_report(result: &str) -> String {
    format!("{FINAL_REPORT_PREFIX}{result}")
}
