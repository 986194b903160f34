// Prompt templates for weekly and single-post generation.
// Reuses the persona and output-format fragments from llm_client::prompts.

use chrono::{Datelike, NaiveDate};

use super::models::{day_label, Category, CategoryHistories, RecentThemeHistory, WEEK};
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, PLAIN_TEXT_SYSTEM, VET_PERSONA};

/// Recent topics listed in a prompt, per category.
const MAX_HISTORY_IN_PROMPT: usize = 10;

/// Weekly batch prompt. Replace: {week_of}, {cat_rules}, {cat_slots}, {dog_rules}, {dog_slots}
pub const BATCH_PROMPT_TEMPLATE: &str = r#"{week_of}からの1週間分（月曜〜日曜）のX投稿を、猫アカウントと犬アカウントそれぞれ7件ずつ作成してください。

■ 猫アカウント
{cat_rules}
{cat_slots}

■ 犬アカウント
{dog_rules}
{dog_slots}

次の形式のJSONオブジェクトのみを返してください（各配列は月曜から日曜の順に必ず7件）:
{
  "cat": ["月曜の投稿文", "火曜の投稿文", "水曜の投稿文", "木曜の投稿文", "金曜の投稿文", "土曜の投稿文", "日曜の投稿文"],
  "dog": ["月曜の投稿文", "火曜の投稿文", "水曜の投稿文", "木曜の投稿文", "金曜の投稿文", "土曜の投稿文", "日曜の投稿文"]
}"#;

/// Single-post prompt. Replace: {rules}, {day}, {role}, {topic}, {instruction}
pub const SINGLE_PROMPT_TEMPLATE: &str = r#"次の条件でX投稿を1件作成してください。

{rules}

【曜日・投稿タイプ】: {day} - {role}
【テーマ】: {topic}
【投稿タイプ別の指示】: {instruction}"#;

/// System prompt for the weekly batch call.
pub fn batch_system() -> String {
    format!("{VET_PERSONA}\n{JSON_ONLY_SYSTEM}")
}

/// System prompt for a single-post call.
pub fn single_system() -> String {
    format!("{VET_PERSONA}\n{PLAIN_TEXT_SYSTEM}")
}

/// Fills the weekly batch template.
pub fn batch_prompt(
    week_of: NaiveDate,
    topics: &[[String; 7]; 2],
    histories: &CategoryHistories,
) -> String {
    BATCH_PROMPT_TEMPLATE
        .replace("{week_of}", &week_of.format("%Y-%m-%d").to_string())
        .replace(
            "{cat_rules}",
            &category_rules(Category::Cat, histories.for_category(Category::Cat)),
        )
        .replace("{cat_slots}", &slot_lines(Category::Cat, &topics[0]))
        .replace(
            "{dog_rules}",
            &category_rules(Category::Dog, histories.for_category(Category::Dog)),
        )
        .replace("{dog_slots}", &slot_lines(Category::Dog, &topics[1]))
}

/// Fills the single-post template for one day of one category.
pub fn single_prompt(
    category: Category,
    date: NaiveDate,
    topic: &str,
    history: &RecentThemeHistory,
) -> String {
    let day = date.weekday();
    let role = category.slot_role(day);
    SINGLE_PROMPT_TEMPLATE
        .replace("{rules}", &category_rules(category, history))
        .replace("{day}", day_label(day))
        .replace("{role}", role.label())
        .replace("{topic}", topic)
        .replace("{instruction}", role.instruction())
}

fn category_rules(category: Category, history: &RecentThemeHistory) -> String {
    let window = category.window();
    let tone = match category {
        Category::Cat => "温かく親しみやすいトーン",
        Category::Dog => "やや固めで丁寧な言葉遣い",
    };
    let mut rules = format!(
        "- 文字数: {}〜{}文字（タイトル・本文・ハッシュタグ・絵文字すべて含む）\n\
         - 必ず【タイトル】で始める\n\
         - 最後は必ず「{}」で終わる\n\
         - 絵文字を4〜5個程度使用\n\
         - {tone}",
        window.min,
        window.max,
        category.tag()
    );
    if !history.is_empty() {
        let recent: Vec<&str> = history.iter().take(MAX_HISTORY_IN_PROMPT).collect();
        rules.push_str(&format!("\n- 最近扱ったテーマとの重複を避ける: {}", recent.join("、")));
    }
    rules
}

fn slot_lines(category: Category, topics: &[String; 7]) -> String {
    WEEK.iter()
        .zip(topics)
        .map(|(day, topic)| {
            let role = category.slot_role(*day);
            format!(
                "{}: テーマ「{topic}」／{}（{}）",
                day_label(*day),
                role.label(),
                role.instruction()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
