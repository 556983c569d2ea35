//! Route table and the static informational pages.

use crate::board::SortOrder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Route {
    #[default]
    Home,
    Policy,
    Recruit,
    Contact,
}

impl Route {
    pub const ALL: [Route; 4] = [Route::Home, Route::Policy, Route::Recruit, Route::Contact];

    /// Resolves a location hash. Anything unrecognized lands on home.
    pub fn from_hash(hash: &str) -> Self {
        match hash.trim() {
            "#policy" => Route::Policy,
            "#recruit" => Route::Recruit,
            "#contact" => Route::Contact,
            _ => Route::Home,
        }
    }

    pub fn hash(self) -> &'static str {
        match self {
            Route::Home => "",
            Route::Policy => "#policy",
            Route::Recruit => "#recruit",
            Route::Contact => "#contact",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Route::Home => "ホーム",
            Route::Policy => "ポリシー",
            Route::Recruit => "掲載依頼",
            Route::Contact => "お問い合わせ",
        }
    }

    pub fn index(self) -> usize {
        Route::ALL
            .iter()
            .position(|route| *route == self)
            .unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Route::ALL[(self.index() + 1) % Route::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Route::ALL[(self.index() + Route::ALL.len() - 1) % Route::ALL.len()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: Option<&'static str>,
    pub paragraphs: Vec<&'static str>,
    pub bullets: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub title: &'static str,
    pub sections: Vec<Section>,
    /// External form the page points at, if any.
    pub link: Option<PageLink>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub label: &'static str,
    pub url: String,
}

/// External form URLs; the board itself has no write path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormLinks {
    pub recruit_form: String,
    pub contact_form: String,
}

pub const INTRO_TITLE: &str = "このサイトについて";
pub const INTRO_TEXT: &str = "被験者募集掲示板へようこそ。ここでは大学の研究や心理学実験への協力者を募集しています。参加の際は必ずポリシーをご確認ください。";
pub const EMPTY_BOARD: &str = "現在、募集中の実験はありません。";
pub const FETCH_FAILED_TITLE: &str = "データの取得に失敗しました";
pub const FETCH_FAILED_HINT: &str = "しばらく経ってから再読み込みしてください。";

pub fn sort_label(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Oldest => "投稿順",
        SortOrder::Newest => "新着順",
    }
}

pub fn count_label(count: usize) -> String {
    format!("{count}件の募集")
}

/// Static content for the non-home routes. Home is built from the post
/// collection instead, so it has no entry here.
pub fn content(route: Route, links: &FormLinks) -> Option<PageContent> {
    match route {
        Route::Home => None,
        Route::Policy => Some(PageContent {
            title: "利用ポリシー",
            sections: vec![
                Section {
                    heading: Some("参加者の方へ"),
                    paragraphs: Vec::new(),
                    bullets: vec![
                        "掲載されている実験・調査は、各研究者の責任において実施されます。",
                        "参加に際して生じたトラブルについて、当掲示板運営は一切の責任を負いかねます。",
                        "実験内容や謝礼に関する不明点は、必ず記載されている連絡先へ直接お問い合わせください。",
                    ],
                },
                Section {
                    heading: Some("研究者の方へ"),
                    paragraphs: Vec::new(),
                    bullets: vec![
                        "所属機関の倫理審査承認を得た研究のみ掲載可能です。",
                        "虚偽の内容や公序良俗に反する内容の掲載は禁止します。",
                    ],
                },
            ],
            link: None,
        }),
        Route::Recruit => Some(PageContent {
            title: "掲載依頼について",
            sections: vec![
                Section {
                    heading: None,
                    paragraphs: vec!["研究者様は、以下の情報をフォームより送信してください。"],
                    bullets: Vec::new(),
                },
                Section {
                    heading: Some("掲載に必要な情報"),
                    paragraphs: Vec::new(),
                    bullets: vec![
                        "研究名、所属機関",
                        "実施責任者、連絡先",
                        "実験概要、謝礼、倫理審査情報",
                    ],
                },
            ],
            link: Some(PageLink {
                label: "掲載依頼フォーム",
                url: links.recruit_form.clone(),
            }),
        }),
        Route::Contact => Some(PageContent {
            title: "お問い合わせ",
            sections: vec![Section {
                heading: None,
                paragraphs: vec![
                    "当サイトに関するご意見・ご質問は、以下のフォームよりご連絡ください。",
                ],
                bullets: Vec::new(),
            }],
            link: Some(PageLink {
                label: "お問い合わせフォーム",
                url: links.contact_form.clone(),
            }),
        }),
    }
}
