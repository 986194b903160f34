//! Weekly theme selector: picks seven topics per category from a static catalog.
//!
//! Selection is deterministic: catalog order, minus anything recently covered. The paired
//! category reuses the Monday topic on Tuesday and the Wednesday topic on Thursday.

use super::models::{Category, RecentThemeHistory, SLOTS_PER_WEEK};

/// Calendar season bucket. The four buckets partition the twelve months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Mar–May spring, Jun–Aug summer, Sep–Nov autumn, Dec–Feb winter.
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }
}

const CAT_BASE: [&str; 16] = [
    "猫の健康管理",
    "猫の行動学",
    "猫のグルーミング",
    "猫の栄養学",
    "猫の病気予防",
    "猫のストレス管理",
    "猫の老齢ケア",
    "猫の応急手当",
    "猫の室内環境",
    "猫の社会化",
    "猫の睡眠",
    "猫の遊び",
    "猫の季節ケア",
    "猫の体重管理",
    "猫の歯のケア",
    "猫の目のケア",
];

const DOG_BASE: [&str; 16] = [
    "犬の健康管理",
    "犬の行動学",
    "犬のしつけ",
    "犬の栄養学",
    "犬の病気予防",
    "犬のストレス管理",
    "犬の老齢ケア",
    "犬の応急手当",
    "犬の散歩",
    "犬の社会化",
    "犬の睡眠",
    "犬の遊び",
    "犬の季節ケア",
    "犬の体重管理",
    "犬の歯のケア",
    "犬種特集",
];

fn seasonal(category: Category, season: Season) -> [&'static str; 4] {
    match (category, season) {
        (Category::Cat, Season::Spring) => ["換毛期ケア", "花粉対策", "春の健康チェック", "ワクチン接種"],
        (Category::Cat, Season::Summer) => ["熱中症対策", "夏の水分補給", "冷房対策", "夏バテ予防"],
        (Category::Cat, Season::Autumn) => ["秋の健康管理", "食欲の秋注意", "換毛期対策", "冬支度"],
        (Category::Cat, Season::Winter) => ["寒さ対策", "乾燥対策", "冬の運動不足", "暖房器具の注意"],
        (Category::Dog, Season::Spring) => {
            ["狂犬病予防接種", "フィラリア予防", "春の健康チェック", "換毛期ケア"]
        }
        (Category::Dog, Season::Summer) => {
            ["熱中症対策", "散歩時間調整", "プールケア", "夏の皮膚トラブル"]
        }
        (Category::Dog, Season::Autumn) => ["秋の健康管理", "食欲管理", "運動量調整", "ワクチン接種"],
        (Category::Dog, Season::Winter) => ["寒さ対策", "関節ケア", "冬の散歩注意", "室内運動"],
    }
}

/// Base topics followed by the seasonal bucket for `month`.
pub fn catalog(category: Category, month: u32) -> Vec<&'static str> {
    let base: &[&str] = match category {
        Category::Cat => &CAT_BASE,
        Category::Dog => &DOG_BASE,
    };
    base.iter()
        .copied()
        .chain(seasonal(category, Season::from_month(month)))
        .collect()
}

/// Selects the seven topics of next week for `category`.
pub fn select(history: &RecentThemeHistory, category: Category, month: u32) -> [String; 7] {
    select_from_catalog(&catalog(category, month), history, category.has_quiz_pairs())
}

/// Core selection over an explicit catalog. Always yields seven topics.
pub fn select_from_catalog(
    catalog: &[&str],
    history: &RecentThemeHistory,
    paired: bool,
) -> [String; 7] {
    let needed = if paired { 5 } else { SLOTS_PER_WEEK };

    let mut chosen: Vec<&str> = catalog
        .iter()
        .copied()
        .filter(|topic| !history.mentions(topic))
        .take(needed)
        .collect();

    if chosen.len() < needed {
        let fresh: Vec<&str> = catalog
            .iter()
            .copied()
            .filter(|topic| !chosen.contains(topic))
            .collect();
        let fill = needed - chosen.len();
        chosen.extend(fresh.into_iter().take(fill));
    }
    if chosen.len() < needed && !catalog.is_empty() {
        let fill = needed - chosen.len();
        chosen.extend(catalog.iter().copied().cycle().take(fill));
    }
    chosen.resize(needed, DEFAULT_TOPIC);

    let layout: [usize; 7] = if paired {
        [0, 0, 1, 1, 2, 3, 4]
    } else {
        [0, 1, 2, 3, 4, 5, 6]
    };
    layout.map(|i| chosen[i].to_string())
}

/// Used only when a catalog is empty.
const DEFAULT_TOPIC: &str = "健康管理";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seasons_cover_all_months() {
        let seasons: Vec<Season> = (1..=12).map(Season::from_month).collect();
        assert_eq!(seasons[0], Season::Winter);
        assert_eq!(seasons[2], Season::Spring);
        assert_eq!(seasons[5], Season::Summer);
        assert_eq!(seasons[8], Season::Autumn);
        assert_eq!(seasons[11], Season::Winter);
    }

    #[test]
    fn test_catalog_has_base_and_seasonal_topics() {
        let cat = catalog(Category::Cat, 7);
        assert_eq!(cat.len(), 20);
        assert_eq!(cat[0], "猫の健康管理");
        assert!(cat.contains(&"熱中症対策"));
        assert!(catalog(Category::Dog, 4).contains(&"フィラリア予防"));
    }

    #[test]
    fn test_empty_history_uses_catalog_order() {
        let topics = select(&RecentThemeHistory::default(), Category::Cat, 10);
        assert_eq!(topics[0], "猫の健康管理");
        assert_eq!(topics[6], "猫の老齢ケア");
    }

    #[test]
    fn test_history_topics_are_skipped() {
        let history = RecentThemeHistory::new(["猫の健康管理のポイント", "猫の行動学入門"]);
        let topics = select(&history, Category::Cat, 10);
        assert!(topics.iter().all(|t| !history.mentions(t)));
        assert_eq!(topics[0], "猫のグルーミング");
    }

    #[test]
    fn test_paired_category_shares_quiz_topics() {
        let topics = select(&RecentThemeHistory::default(), Category::Dog, 1);
        assert_eq!(topics[0], topics[1]);
        assert_eq!(topics[2], topics[3]);
        assert_ne!(topics[0], topics[2]);
        let mut distinct: Vec<&String> = topics.iter().collect();
        distinct.dedup();
        assert_eq!(distinct.len(), 5);
    }

    #[test]
    fn test_short_availability_fills_from_catalog_order() {
        let catalog: Vec<String> = (0..16).map(|i| format!("topic-{i:02}")).collect();
        let refs: Vec<&str> = catalog.iter().map(String::as_str).collect();
        let history = RecentThemeHistory::new(
            catalog
                .iter()
                .filter(|t| t.as_str() != "topic-03" && t.as_str() != "topic-09")
                .cloned(),
        );

        let topics = select_from_catalog(&refs, &history, false);
        assert_eq!(
            topics,
            ["topic-03", "topic-09", "topic-00", "topic-01", "topic-02", "topic-04", "topic-05"]
                .map(String::from)
        );
    }

    #[test]
    fn test_tiny_and_empty_catalogs_still_yield_seven() {
        let topics = select_from_catalog(&["a", "b"], &RecentThemeHistory::default(), false);
        assert_eq!(topics, ["a", "b", "a", "b", "a", "b", "a"].map(String::from));

        let topics = select_from_catalog(&[], &RecentThemeHistory::default(), true);
        assert!(topics.iter().all(|t| t == DEFAULT_TOPIC));
    }
}
