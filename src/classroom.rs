// classroom.rs
//
// A small math class: the teacher asks questions, the student answers them,
// and the admin ends the class once enough answers were marked correct.

use crate::agent::{Agent, ReplyContext};
use crate::config::Config;
use crate::error::{ConfigError, InvocationError, ReplyError, SetupError};
use crate::function::{Arguments, FunctionDefinition, FunctionRegistry, ParameterKind};
use crate::group_chat::GroupChat;
use crate::message::{FunctionCall, Message, META_NEXT_SPEAKER, TERMINATE};
use crate::responder::{FnResponder, ModelResponder};
use serde_json::json;
use std::sync::Arc;

pub const ADMIN: &str = "Admin";
pub const TEACHER: &str = "Teacher";
pub const STUDENT: &str = "Student";
pub const TEACHING_ASSISTANT: &str = "TeachingAssistant";

pub const MATH_QUESTION: &str = "[MATH_QUESTION]";
pub const MATH_ANSWER: &str = "[MATH_ANSWER]";
pub const ANSWER_IS_CORRECT: &str = "[ANSWER_IS_CORRECT]";
pub const UPDATE_PROGRESS: &str = "[UPDATE_PROGRESS]";

/// Correct answers needed before the admin ends the class.
pub const QUESTIONS_TO_PASS: i64 = 5;

pub const ADMIN_SYSTEM_MESSAGE: &str = "You are the admin of the math class. \
Each time you speak, count the messages marked [ANSWER_IS_CORRECT] and call \
update_progress with that count. Never ask or answer questions yourself.";

pub const TEACHER_SYSTEM_MESSAGE: &str = "You are a math teacher. Create one \
easy math question at a time with create_math_question and number them from 1. \
When the student answers, check the answer and call answer_is_correct if it \
is right. Otherwise tell the student what went wrong.";

pub const STUDENT_SYSTEM_MESSAGE: &str = "You are a student. When the teacher \
asks a math question, work it out and reply with answer_question.";

pub const TEACHING_ASSISTANT_SYSTEM_MESSAGE: &str = "You help the teacher by \
checking the student's answers and calling answer_is_correct when one is right.";

/// Questions the scripted teacher asks, with their expected answers.
static QUESTIONS: [(&str, &str); 6] = [
    ("What is 1 + 1?", "2"),
    ("What is 2 * 3?", "6"),
    ("What is 10 - 4?", "6"),
    ("What is 12 / 3?", "4"),
    ("What is 7 + 8?", "15"),
    ("What is 9 * 9?", "81"),
];

fn create_math_question() -> FunctionDefinition {
    FunctionDefinition::new("create_math_question", "Ask the student a new math question")
        .param("question", ParameterKind::String, "the question to ask")
        .param("question_index", ParameterKind::Integer, "question number, from 1")
}

fn answer_question() -> FunctionDefinition {
    FunctionDefinition::new("answer_question", "Answer the current math question")
        .param("answer", ParameterKind::String, "the answer")
}

fn answer_is_correct() -> FunctionDefinition {
    FunctionDefinition::new("answer_is_correct", "Mark the student's answer as correct")
        .param("message", ParameterKind::String, "a word for the student")
}

fn update_progress() -> FunctionDefinition {
    FunctionDefinition::new("update_progress", "Report how many questions were solved")
        .param(
            "correct_answer_count",
            ParameterKind::Integer,
            "number of answers marked correct so far",
        )
}

fn on_create_math_question(text: &str) -> Result<String, InvocationError> {
    let args = Arguments::parse(text)?;
    let index = args.i64("question_index")?;
    if index < 1 {
        return Err(InvocationError::failed("question_index starts at 1"));
    }
    Ok(format!(
        "{}\nQuestion #{}:\n{}",
        MATH_QUESTION,
        index,
        args.str("question")?
    ))
}

fn on_answer_question(text: &str) -> Result<String, InvocationError> {
    let args = Arguments::parse(text)?;
    Ok(format!(
        "{}\nThe answer is {}, teacher please check answer",
        MATH_ANSWER,
        args.str("answer")?
    ))
}

fn on_answer_is_correct(text: &str) -> Result<String, InvocationError> {
    let args = Arguments::parse(text)?;
    Ok(format!("{}\n{}", ANSWER_IS_CORRECT, args.str("message")?))
}

fn on_update_progress(text: &str) -> Result<String, InvocationError> {
    let count = Arguments::parse(text)?.i64("correct_answer_count")?;
    if count >= QUESTIONS_TO_PASS {
        return Ok(TERMINATE.to_string());
    }
    Ok(format!(
        "{}\nthe number of resolved question is {}\nteacher, please create the next math question",
        UPDATE_PROGRESS, count
    ))
}

/// Registers one of the classroom functions by name.
///
/// # Returns
/// * `Err(ConfigError::UnknownFunction)` if `function` is not part of the class.
pub fn register_classroom_function(
    registry: &mut FunctionRegistry,
    agent: &str,
    function: &str,
) -> Result<(), ConfigError> {
    let result = match function {
        "create_math_question" => registry.register(create_math_question(), on_create_math_question),
        "answer_question" => registry.register(answer_question(), on_answer_question),
        "answer_is_correct" => registry.register(answer_is_correct(), on_answer_is_correct),
        "update_progress" => registry.register(update_progress(), on_update_progress),
        _ => {
            return Err(ConfigError::UnknownFunction {
                agent: agent.to_string(),
                function: function.to_string(),
            })
        }
    };
    result.map_err(ConfigError::from)
}

/// The messages that open every class.
pub fn seed_messages() -> Vec<Message> {
    vec![
        Message::text(ADMIN, "Welcome to the group chat! I'm admin"),
        Message::text(TEACHER, "Hey I'm Teacher"),
        Message::text(STUDENT, "Hey I'm Student"),
        Message::text(
            ADMIN,
            format!(
                "Teacher, create math questions for the student and the student answers them. \
                 The class ends after {} correct answers.",
                QUESTIONS_TO_PASS
            ),
        ),
    ]
}

/// Builds a classroom from `config`, every agent backed by the Ollama model.
pub fn model_classroom(config: &Config) -> Result<GroupChat, ConfigError> {
    let mut participants = Vec::with_capacity(config.agents.len());
    for agent in &config.agents {
        let mut functions = FunctionRegistry::new();
        for function in &agent.functions {
            register_classroom_function(&mut functions, &agent.name, function)?;
        }
        participants.push(Arc::new(Agent::new(
            agent.name.clone(),
            agent.system_message.clone(),
            functions,
            ModelResponder::new(config.model()),
        )));
    }

    let mut chat = GroupChat::new(participants)?;
    if let Some(admin) = config.agents.iter().find(|a| a.admin) {
        chat.set_admin(&admin.name)?;
    }
    Ok(chat)
}

fn count_marked(history: &[Message], marker: &str) -> usize {
    history.iter().filter(|m| m.content_contains(marker)).count()
}

/// The question currently on the table: its 1-based number and expected answer.
fn current_question(ctx: &ReplyContext<'_>) -> Result<(usize, &'static str), ReplyError> {
    let asked = count_marked(ctx.history, MATH_QUESTION);
    match asked.checked_sub(1).and_then(|i| QUESTIONS.get(i)) {
        Some(&(_, answer)) => Ok((asked, answer)),
        None => Err(ReplyError::failed("no question has been asked yet")),
    }
}

fn call(ctx: &ReplyContext<'_>, name: &str, arguments: serde_json::Value) -> Message {
    Message::function_call(ctx.agent, FunctionCall::new(name, arguments.to_string()))
}

fn scripted_admin() -> Result<Agent, SetupError> {
    let mut agent = Agent::with_strategy(
        ADMIN,
        ADMIN_SYSTEM_MESSAGE,
        FnResponder::new(|ctx| {
            let correct = count_marked(ctx.history, ANSWER_IS_CORRECT);
            Ok(
                call(ctx, "update_progress", json!({ "correct_answer_count": correct }))
                    .with_metadata(META_NEXT_SPEAKER, TEACHER),
            )
        }),
    );
    agent.register_function(update_progress(), on_update_progress)?;
    Ok(agent)
}

fn scripted_teacher() -> Result<Agent, SetupError> {
    let mut agent = Agent::with_strategy(
        TEACHER,
        TEACHER_SYSTEM_MESSAGE,
        FnResponder::new(|ctx| {
            let index = count_marked(ctx.history, MATH_QUESTION);
            let (question, _) = QUESTIONS
                .get(index)
                .ok_or_else(|| ReplyError::failed("out of questions"))?;
            Ok(call(
                ctx,
                "create_math_question",
                json!({ "question": question, "question_index": index + 1 }),
            ))
        }),
    );
    agent.register_function(create_math_question(), on_create_math_question)?;
    Ok(agent)
}

fn scripted_student() -> Result<Agent, SetupError> {
    let mut agent = Agent::with_strategy(
        STUDENT,
        STUDENT_SYSTEM_MESSAGE,
        FnResponder::new(|ctx| {
            let (_, answer) = current_question(ctx)?;
            Ok(call(ctx, "answer_question", json!({ "answer": answer })))
        }),
    );
    agent.register_function(answer_question(), on_answer_question)?;
    Ok(agent)
}

fn scripted_teaching_assistant() -> Result<Agent, SetupError> {
    let mut agent = Agent::with_strategy(
        TEACHING_ASSISTANT,
        TEACHING_ASSISTANT_SYSTEM_MESSAGE,
        FnResponder::new(|ctx| {
            let (index, expected) = current_question(ctx)?;
            let expected_line = format!("The answer is {},", expected);
            let correct = ctx
                .history
                .iter()
                .rev()
                .find(|m| m.content_contains(MATH_ANSWER))
                .is_some_and(|m| m.content_contains(&expected_line));
            if correct {
                let message = format!("Question #{} is solved, well done!", index);
                Ok(call(ctx, "answer_is_correct", json!({ "message": message })))
            } else {
                Ok(Message::text(ctx.agent, "That is not right yet, please try again."))
            }
        }),
    );
    agent.register_function(answer_is_correct(), on_answer_is_correct)?;
    Ok(agent)
}

/// A deterministic classroom that needs no model.
///
/// Speaking order is admin, teacher, student, teaching assistant. The admin
/// hands the floor to the teacher after every progress update.
pub fn scripted_classroom() -> Result<GroupChat, SetupError> {
    let admin = Arc::new(scripted_admin()?);
    GroupChat::with_admin(
        admin,
        vec![
            Arc::new(scripted_teacher()?),
            Arc::new(scripted_student()?),
            Arc::new(scripted_teaching_assistant()?),
        ],
    )
}
