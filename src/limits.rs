/// リクエストパーサーの制限設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserLimits {
    /// 読み取りバッファの初期サイズ (デフォルト: 8 バイト)
    ///
    /// バッファが一杯になるたびに 2 倍に拡張する。
    /// 小さい値ほど拡張処理が頻繁に走る。
    pub initial_buffer_size: usize,
    /// 最大バッファサイズ (デフォルト: 64KB)
    pub max_buffer_size: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            initial_buffer_size: 8,
            max_buffer_size: 64 * 1024, // 64KB
        }
    }
}
