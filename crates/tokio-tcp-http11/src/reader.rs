//! ソケットからリクエストを読み取る

use tcp_http11::{ParserLimits, ReadBuffer, Request, RequestParser};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::Result;

/// リクエストを 1 つ読み取る
///
/// バッファが一杯になるたびに容量を 2 倍にしながら、パーサーが `Done` に
/// なるまで読み続ける。`Done` の前に EOF に達した場合は
/// `IncompleteRequest` を返す。
pub async fn read_request<R>(reader: &mut R, limits: &ParserLimits) -> Result<Request>
where
    R: AsyncRead + Unpin,
{
    let mut buf = ReadBuffer::with_capacity(limits.initial_buffer_size);
    let mut parser = RequestParser::new();

    while !parser.is_done() {
        buf.grow_if_full(limits.max_buffer_size)?;
        let n = reader.read(buf.spare_mut()).await?;
        if n == 0 {
            parser.mark_eof()?;
            break;
        }
        buf.advance(n);

        let consumed = parser.parse(buf.filled())?;
        buf.consume(consumed);
    }

    Ok(parser.into_request()?)
}
