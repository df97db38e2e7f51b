use crate::agent::ReplyContext;
use crate::function::FunctionDefinition;
use crate::message::Message;

pub struct Prompt;

impl Prompt {
    pub const FUNCTION_CALL_HELP: &'static str = "To call a function, reply with only a JSON object of the form \
{\"function_call\": {\"name\": \"<function name>\", \"arguments\": {<arguments>}}}.";

    pub const NEXT_SPEAKER_HELP: &'static str = "To choose who speaks next, reply with only a JSON object of the form \
{\"content\": \"<your message>\", \"next_speaker\": \"<name>\"}. \
A \"next_speaker\" key may also sit next to a \"function_call\".";

    /// Full prompt for a model-backed agent: persona, functions, then the conversation.
    pub fn render(ctx: &ReplyContext<'_>) -> String {
        let mut prompt = format!("You are {}. {}\n", ctx.agent, ctx.system_context.trim());

        let functions = ctx.function_definitions();
        if !functions.is_empty() {
            prompt.push_str("\nAvailable functions:\n");
            for definition in functions {
                prompt.push_str(&Self::describe_function(definition));
                prompt.push('\n');
            }
            prompt.push_str(Self::FUNCTION_CALL_HELP);
            prompt.push('\n');
        }

        if ctx.is_admin() {
            prompt.push_str(&format!(
                "\nYou lead this chat. Participants: {}.\n",
                ctx.participants.join(", ")
            ));
            prompt.push_str(Self::NEXT_SPEAKER_HELP);
            prompt.push('\n');
        }

        prompt.push_str("\nConversation so far:\n");
        for message in ctx.history {
            prompt.push_str(&Self::history_line(message));
            prompt.push('\n');
        }
        prompt.push_str(&format!("\nReply as {}:", ctx.agent));
        prompt
    }

    /// One transcript line: `from: content`, or the function call when there is no content.
    pub fn history_line(message: &Message) -> String {
        match (&message.content, &message.function_call) {
            (Some(content), _) => format!("{}: {}", message.from, content),
            (None, Some(call)) => format!("{}: <call {}({})>", message.from, call.name, call.arguments),
            (None, None) => format!("{}:", message.from),
        }
    }

    fn describe_function(definition: &FunctionDefinition) -> String {
        let params: Vec<String> = definition
            .parameters
            .iter()
            .map(|p| {
                let marker = if p.required { "" } else { "?" };
                format!("{}{}: {}", p.name, marker, p.kind.as_str())
            })
            .collect();
        format!(
            "- {}({}): {}",
            definition.name,
            params.join(", "),
            definition.description
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{FunctionRegistry, ParameterKind};
    use crate::message::FunctionCall;

    #[test]
    fn test_render_lists_functions_and_history() {
        let mut functions = FunctionRegistry::new();
        functions
            .register(
                FunctionDefinition::new("answer_question", "Answer the question")
                    .param("answer", ParameterKind::String, ""),
                |_| Ok(String::new()),
            )
            .unwrap();
        let history = vec![
            Message::text("Teacher", "Question #1: 1 + 1?"),
            Message::function_call("Student", FunctionCall::new("answer_question", r#"{"answer":"2"}"#)),
        ];
        let ctx = ReplyContext {
            agent: "Student",
            system_context: "You are a student.",
            functions: &functions,
            history: &history,
            participants: &[],
            admin: None,
        };

        let prompt = Prompt::render(&ctx);
        assert!(prompt.starts_with("You are Student. You are a student."));
        assert!(prompt.contains("- answer_question(answer: string): Answer the question"));
        assert!(prompt.contains("Teacher: Question #1: 1 + 1?"));
        assert!(prompt.contains("Student: <call answer_question({\"answer\":\"2\"})>"));
        assert!(prompt.ends_with("Reply as Student:"));
        assert!(!prompt.contains("next_speaker"));
    }

    #[test]
    fn test_render_tells_the_admin_how_to_pick_a_speaker() {
        let functions = FunctionRegistry::new();
        let participants = ["Admin", "Teacher", "Student"];
        let mut ctx = ReplyContext {
            agent: "Admin",
            system_context: "You run the class.",
            functions: &functions,
            history: &[],
            participants: &participants,
            admin: Some("Admin"),
        };
        let prompt = Prompt::render(&ctx);
        assert!(prompt.contains("Participants: Admin, Teacher, Student."));
        assert!(prompt.contains(Prompt::NEXT_SPEAKER_HELP));

        ctx.agent = "Teacher";
        assert!(!Prompt::render(&ctx).contains("next_speaker"));
    }

    #[test]
    fn test_render_without_functions_omits_help() {
        let functions = FunctionRegistry::new();
        let ctx = ReplyContext {
            agent: "Admin",
            system_context: "",
            functions: &functions,
            history: &[],
            participants: &[],
            admin: None,
        };
        assert!(!Prompt::render(&ctx).contains("function_call"));
    }
}
