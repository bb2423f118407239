//! 読み取りバッファ
//!
//! ソケットから読んだバイト列をパーサーに渡すまで保持する。
//! 一杯になったら容量を 2 倍に拡張し、パーサーが消費した分は先頭に詰める。

use crate::error::Error;

/// 拡張可能な読み取りバッファ
#[derive(Debug)]
pub struct ReadBuffer {
    buf: Vec<u8>,
    filled: usize,
}

impl ReadBuffer {
    /// 指定した初期容量で作成 (0 の場合は 1)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity.max(1)],
            filled: 0,
        }
    }

    /// 現在の容量
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// 一杯なら容量を 2 倍にする
    ///
    /// 拡張後の容量が `limit` を超える場合は `BufferOverflow` を返す。
    pub fn grow_if_full(&mut self, limit: usize) -> Result<(), Error> {
        if self.filled < self.buf.len() {
            return Ok(());
        }
        let new_size = self.buf.len().saturating_mul(2);
        if new_size > limit {
            return Err(Error::BufferOverflow {
                size: new_size,
                limit,
            });
        }
        self.buf.resize(new_size, 0);
        Ok(())
    }

    /// 書き込み可能な未使用領域
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.filled..]
    }

    /// `spare_mut()` に `n` バイト書き込んだことを記録
    pub fn advance(&mut self, n: usize) {
        self.filled = (self.filled + n).min(self.buf.len());
    }

    /// 読み取り済み (未消費) のデータ
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.filled]
    }

    /// 先頭 `n` バイトを捨て、残りを先頭に詰める
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.filled);
        self.buf.copy_within(n..self.filled, 0);
        self.filled -= n;
    }
}
