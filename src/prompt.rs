//! Prompt assembly for explanation requests. All prompt text is Japanese
//! because the product audience is Japanese learners.

use crate::language::language_display_name;
use serde::{Deserialize, Serialize};

/// System prompt sent with every explanation request.
pub const CODE_REVIEW_SYSTEM: &str = r#"あなたはコードレビューの専門家です。以下のルールに従って回答してください：

1. 構文エラーがある場合は、具体的なエラー内容、問題箇所、修正方法を説明する
2. 実際のコードが提供された場合のみ、詳細な解説を行う
3. コードの断片でも、文法的に意味がある場合は解説する
4. 回答はMarkdown形式で記述する
5. 構文エラーの説明は、初心者にも理解しやすいように具体的に行う"#;

/// Reader skill level the explanation is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplainLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl ExplainLevel {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }

    pub fn as_id(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    /// Audience label used inside prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Beginner => "初心者",
            Self::Intermediate => "中級者",
            Self::Advanced => "上級者",
        }
    }

    fn sections(&self) -> &'static LevelSections {
        match self {
            Self::Beginner => &BEGINNER_SECTIONS,
            Self::Intermediate => &INTERMEDIATE_SECTIONS,
            Self::Advanced => &ADVANCED_SECTIONS,
        }
    }
}

/// Writing style requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplainTone {
    Casual,
    #[default]
    Normal,
    Formal,
}

impl ExplainTone {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "casual" => Some(Self::Casual),
            "normal" => Some(Self::Normal),
            "formal" => Some(Self::Formal),
            _ => None,
        }
    }

    pub fn as_id(&self) -> &'static str {
        match self {
            Self::Casual => "casual",
            Self::Normal => "normal",
            Self::Formal => "formal",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Casual => "カジュアル",
            Self::Normal => "通常",
            Self::Formal => "フォーマル",
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            Self::Casual => {
                "フレンドリーでカジュアルな口調で解説してください。「〜だよ」「〜してみよう」を使ってください。"
            }
            Self::Normal => {
                "標準的な口調で解説してください。「〜です」「〜ます」を使ってください。"
            }
            Self::Formal => {
                "丁寧でフォーマルな口調で解説してください。「〜いたします」「〜でございます」を使ってください。"
            }
        }
    }
}

/// One heading in the requested answer format.
#[derive(Debug, Clone, Copy)]
pub struct PromptSection {
    pub title: &'static str,
    pub description: &'static str,
}

/// Answer format for one skill level.
struct LevelSections {
    summary: PromptSection,
    how_it_works: PromptSection,
    key_techniques: PromptSection,
    watch_out: PromptSection,
    tips: PromptSection,
    related_links: Option<PromptSection>,
}

impl LevelSections {
    fn ordered(&self) -> Vec<&PromptSection> {
        let mut sections = vec![
            &self.summary,
            &self.how_it_works,
            &self.key_techniques,
            &self.watch_out,
            &self.tips,
        ];
        if let Some(links) = &self.related_links {
            sections.push(links);
        }
        sections
    }
}

static BEGINNER_SECTIONS: LevelSections = LevelSections {
    summary: PromptSection {
        title: "## 概要",
        description: "コードが何をしているのか、平易な言葉で説明してください。",
    },
    how_it_works: PromptSection {
        title: "## 動作の仕組み",
        description: "コードがどう動くのか、重要な部分を中心に順を追って説明してください。",
    },
    key_techniques: PromptSection {
        title: "## 使われている技術",
        description: "コードで使われている主要な機能、メソッド、パターンを箇条書きで説明してください。",
    },
    watch_out: PromptSection {
        title: "## 注意点",
        description: "このコードを使う時に注意すべき点や、よくあるミスを箇条書きで説明してください。",
    },
    tips: PromptSection {
        title: "## ヒント",
        description: "このコードをより良く使うための実用的なアドバイスがあれば箇条書きで紹介してください。",
    },
    related_links: None,
};

static INTERMEDIATE_SECTIONS: LevelSections = LevelSections {
    summary: PromptSection {
        title: "## 概要",
        description: "コードの構造と設計意図を説明してください。",
    },
    how_it_works: PromptSection {
        title: "## 動作の仕組み",
        description: "データの流れや処理のフロー、アルゴリズムのポイントを説明してください。",
    },
    key_techniques: PromptSection {
        title: "## 使われている技術",
        description: "設計パターン、フレームワークの機能、ベストプラクティスを箇条書きで説明してください。",
    },
    watch_out: PromptSection {
        title: "## 注意点",
        description: "パフォーマンス上の懸念、エッジケース、メンテナンス時の課題を箇条書きで説明してください。",
    },
    tips: PromptSection {
        title: "## 実装のコツ",
        description: "より効率的な実装方法、リファクタリングのポイントがあれば箇条書きで紹介してください。",
    },
    related_links: Some(PromptSection {
        title: "## 参考リンク",
        description: "公式ドキュメントや関連記事があれば箇条書きで紹介してください。",
    }),
};

static ADVANCED_SECTIONS: LevelSections = LevelSections {
    summary: PromptSection {
        title: "## 概要",
        description: "アーキテクチャレベルの分析とパフォーマンス特性を説明してください。",
    },
    how_it_works: PromptSection {
        title: "## 動作の仕組み",
        description: "内部実装の詳細、計算量、メモリ効率、並行処理の仕組みを説明してください。",
    },
    key_techniques: PromptSection {
        title: "## 技術的な選択",
        description: "アルゴリズムの選定理由、トレードオフ、最適化手法、システム設計の原則を箇条書きで説明してください。",
    },
    watch_out: PromptSection {
        title: "## 潜在的な問題",
        description: "スケーラビリティ、セキュリティ、競合状態、メモリリークなどの深刻な問題を箇条書きで説明してください。",
    },
    tips: PromptSection {
        title: "## 最適化のアプローチ",
        description: "プロファイリング結果に基づく最適化、代替アルゴリズムがあれば箇条書きで紹介してください。",
    },
    related_links: None,
};

const ADVANCED_ANALYSIS_SUFFIX: &str =
    "パフォーマンス（時間/空間計算量）、保守性、拡張性、セキュリティの観点から分析してください。";

const DIFF_SECTIONS: &str = r#"## 変更の概要
何が追加/削除/変更されたか要約してください。

## 変更後の構文・API
変更後のコードで使用されている主要な構文やAPIを箇条書きで説明してください。

## 注意点
変更によって生じた新たな注意点や解消された問題を箇条書きで説明してください。

## さらなる改善案
さらに良い実装例があれば、15行以内のコードで示してください。"#;

/// Tone directive plus the Japanese/English spacing rules shared by every
/// explanation prompt.
fn style_instructions(tone: ExplainTone) -> String {
    format!(
        "**口調に関する指示：**\n{}\n\n**文章作成時の重要な注意事項：**\n- 日本語と英語（単語・記号・数字）の間には必ず半角スペースを入れてください\n- 例：「JavaScript のコード」「API の使用」「React コンポーネント」「HTML 要素」",
        tone.instruction()
    )
}

fn render_sections(sections: &LevelSections) -> String {
    sections
        .ordered()
        .iter()
        .map(|section| format!("{}\n{}", section.title, section.description))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the user prompt for a single-snapshot explanation.
pub fn build_code_prompt(
    code: &str,
    language: &str,
    level: ExplainLevel,
    tone: ExplainTone,
) -> String {
    let lang_name = language_display_name(language);
    let mut prompt = format!(
        "以下の{}コードを解析して、理解しやすく解説してください。\n\n{}\n\n解説形式：\n\n{}",
        lang_name,
        style_instructions(tone),
        render_sections(level.sections()),
    );
    if level == ExplainLevel::Advanced {
        prompt.push_str("\n\n");
        prompt.push_str(ADVANCED_ANALYSIS_SUFFIX);
    }
    prompt.push_str("\n\n入力：\n");
    prompt.push_str(code);
    prompt
}

/// Build the user prompt for a before/after diff explanation.
pub fn build_diff_prompt(
    before: &str,
    after: &str,
    language: &str,
    level: ExplainLevel,
    tone: ExplainTone,
) -> String {
    let lang_name = language_display_name(language);
    format!(
        "以下の{}コードの変更を{}向けに解説してください。\n\n{}\n\n{}\n\n変更前のコード：\n{}\n\n変更後のコード：\n{}",
        lang_name,
        level.label(),
        style_instructions(tone),
        DIFF_SECTIONS,
        before,
        after,
    )
}
