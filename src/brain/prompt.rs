//! Prompt assembly for a single turn.

use crate::world::{Mood, TurnContext};

pub const USER_PROMPT: &str = "Что ты будешь делать сейчас? Ответь только JSON.";

const REPLY_FORMAT: &str = r#"{"actionType":"TALK|THINK|WORK|REST|MOVE","targetAgentId":"id или null","content":"текст","newMood":"одно из настроений выше","affinityChange":число или null}"#;

pub fn system_prompt(ctx: &TurnContext) -> String {
    let agent = &ctx.agent;
    let memories = agent.recent_memories(ctx.prompt_memories).join("; ");
    let events = ctx.recent_events.join("; ");
    let others = serde_json::to_string(&ctx.others).unwrap_or_else(|_| "[]".to_string());

    format!(
        "Ты играешь роль персонажа в симуляции. Твое имя: {name}.
Твоя роль: {role}.
Твоя личность: {personality}.
Твое текущее настроение: {mood}.

Твои недавние воспоминания: {memories}.
Последние события в мире: {events}.
Глобальный контекст: {context}.

Другие агенты рядом: {others}.

Ты должен выбрать одно действие. Если ты выбираешь TALK (разговор), выбери ID агента.
Если ты реагируешь на чьи-то слова, ответь им.
Контент должен быть на русском языке.

AffinityChange: если ты общаешься, как изменилось твое отношение к этому агенту? (-5 до +5).
NewMood: выбери новое настроение из списка [{moods}].

Ответь только валидным JSON без markdown и пояснений, в формате:
{format}",
        name = agent.name,
        role = agent.role,
        personality = agent.personality,
        mood = agent.mood,
        context = ctx.global_context,
        moods = Mood::catalogue(),
        format = REPLY_FORMAT,
    )
}
