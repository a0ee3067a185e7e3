/// Vision-capable Claude models.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    strum::IntoStaticStr,
)]
pub enum Model {
    #[default]
    #[strum(to_string = "claude-sonnet-4-20250514")]
    ClaudeSonnet4,
    #[strum(to_string = "claude-opus-4-20250514")]
    ClaudeOpus4,
    #[strum(to_string = "claude-3-7-sonnet-latest")]
    Claude37SonnetLatest,
    #[strum(to_string = "claude-3-5-sonnet-latest")]
    Claude35SonnetLatest,
    #[strum(to_string = "claude-3-5-haiku-latest")]
    Claude35HaikuLatest,
    #[strum(to_string = "claude-3-haiku-20240307")]
    Claude3Haiku20240307,
}

impl From<Model> for String {
    fn from(model: Model) -> Self {
        model.to_string()
    }
}
