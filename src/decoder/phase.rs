//! デコード状態の定義

/// リクエストのパース状態
///
/// `InitializingLine → ParsingHeaders → ParsingBody → Done` の順にのみ遷移する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// リクエストライン待ち
    InitializingLine,
    /// ヘッダー待ち
    ParsingHeaders,
    /// ボディ読み取り中
    ParsingBody,
    /// 完了
    Done,
}

impl ParseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseState::InitializingLine => "parsing request-line",
            ParseState::ParsingHeaders => "parsing headers",
            ParseState::ParsingBody => "parsing body",
            ParseState::Done => "done",
        }
    }
}

/// chunked ボディのデコード状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChunkPhase {
    /// チャンクサイズ行待ち
    Size,
    /// チャンクデータ待ち
    Data { remaining: usize },
    /// チャンクデータ後の CRLF 待ち
    DataCrlf,
    /// トレーラー待ち
    Trailer,
    /// 完了
    Complete,
}

/// レスポンスのデコード状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponsePhase {
    /// ステータスライン待ち
    StatusLine,
    /// ヘッダー待ち
    Headers,
    /// ボディ読み取り中
    Body,
    /// 完了
    Complete,
}
