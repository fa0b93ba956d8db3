//! hook function: (chunk size (diff), total written, data size)

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use pin_project::pin_project;

pub type ProgressHook = Arc<dyn Fn(usize, u64, u64) + Send + Sync + 'static>;

/// Reports every chunk pulled out of the wrapped body stream to a hook.
#[pin_project]
pub struct ProgressStream<S> {
    #[pin]
    inner: S,
    hook: ProgressHook,
    written: u64,
    length: u64,
}

impl<S> ProgressStream<S> {
    pub fn new(inner: S, hook: ProgressHook, length: u64) -> Self {
        ProgressStream {
            inner,
            hook,
            written: 0,
            length,
        }
    }
}

impl<S, E> Stream for ProgressStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(data))) => {
                *this.written += data.len() as u64;
                (this.hook)(data.len(), *this.written, *this.length);
                Poll::Ready(Some(Ok(data)))
            }
            other => other,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub trait TrackableStream: Sized {
    fn track(self, length: u64, hook: ProgressHook) -> ProgressStream<Self>;
}

impl<S, E> TrackableStream for S
where
    S: Stream<Item = Result<Bytes, E>>,
{
    fn track(self, length: u64, hook: ProgressHook) -> ProgressStream<Self> {
        ProgressStream::new(self, hook, length)
    }
}

/// `round(written * 100 / total)`, clamped to 100. An empty body counts as complete.
pub fn percent(written: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let written = written.min(total) as u128;
    let total = total as u128;
    ((written * 200 + total) / (total * 2)) as u8
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::{stream, StreamExt};

    use super::*;

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(0, 400), 0);
        assert_eq!(percent(1, 400), 0);
        assert_eq!(percent(2, 400), 1);
        assert_eq!(percent(100, 400), 25);
        assert_eq!(percent(399, 400), 100);
        assert_eq!(percent(400, 400), 100);
    }

    #[test]
    fn percent_handles_edges() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(500, 400), 100);
        assert_eq!(percent(u64::MAX / 2, u64::MAX), 50);
    }

    #[tokio::test]
    async fn hook_sees_every_chunk() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();
        let hook: ProgressHook = Arc::new(move |chunk, written, total| {
            seen.lock().unwrap().push((chunk, written, total));
        });

        let chunks = vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"abcd")),
            Ok(Bytes::from_static(b"ef")),
            Ok(Bytes::from_static(b"ghij")),
        ];
        let body: Vec<_> = stream::iter(chunks).track(10, hook).collect().await;

        assert_eq!(body.len(), 3);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![(4, 4, 10), (2, 6, 10), (4, 10, 10)]
        );
    }

    #[tokio::test]
    async fn errors_pass_through_without_progress() {
        let calls = Arc::new(Mutex::new(0));
        let seen = calls.clone();
        let hook: ProgressHook = Arc::new(move |_, _, _| *seen.lock().unwrap() += 1);

        let chunks = vec![Err::<Bytes, _>(std::io::Error::from(
            std::io::ErrorKind::BrokenPipe,
        ))];
        let body: Vec<_> = stream::iter(chunks).track(10, hook).collect().await;

        assert!(body[0].is_err());
        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
