//! Rate limiting for snapshot streams

use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait to add throttling to any Stream
pub trait ThrottleExt: Stream {
    /// Emit at most once per `duration`
    ///
    /// Latest-wins: items that arrive within one interval collapse into the
    /// newest one. An item arriving after a quiet period is emitted at once.
    fn throttle(self, duration: Duration) -> Throttle<Self>
    where
        Self: Sized,
    {
        Throttle::new(self, duration)
    }
}

impl<T: Stream> ThrottleExt for T {}

pin_project! {
    /// A stream combinator that throttles emission rate
    pub struct Throttle<S: Stream> {
        #[pin]
        stream: S,
        interval: Interval,
        pending: Option<S::Item>,
        tick_ready: bool,
        done: bool,
    }
}

impl<S: Stream> Throttle<S> {
    pub fn new(stream: S, duration: Duration) -> Self {
        let mut interval = interval(duration);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { stream, interval, pending: None, tick_ready: false, done: false }
    }
}

impl<S: Stream> Stream for Throttle<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Drain everything available, keeping only the latest
        while !*this.done {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.pending = Some(item),
                Poll::Ready(None) => *this.done = true,
                Poll::Pending => break,
            }
        }

        if !*this.tick_ready && this.interval.poll_tick(cx).is_ready() {
            *this.tick_ready = true;
        }

        if *this.tick_ready && this.pending.is_some() {
            *this.tick_ready = false;
            return Poll::Ready(this.pending.take());
        }

        if *this.done && this.pending.is_none() {
            return Poll::Ready(None);
        }

        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_latest() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut throttled = UnboundedReceiverStream::new(rx).throttle(Duration::from_millis(100));

        tx.send(1).unwrap();
        assert_eq!(throttled.next().await, Some(1));

        for i in 2..=5 {
            tx.send(i).unwrap();
        }
        assert_eq!(throttled.next().await, Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_interval_does_not_end_stream() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut throttled = UnboundedReceiverStream::new(rx).throttle(Duration::from_millis(10));

        tx.send("a").unwrap();
        assert_eq!(throttled.next().await, Some("a"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send("b").unwrap();
        assert_eq!(throttled.next().await, Some("b"));

        drop(tx);
        assert_eq!(throttled.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn flushes_pending_item_when_source_ends() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut throttled = UnboundedReceiverStream::new(rx).throttle(Duration::from_millis(100));

        tx.send(1).unwrap();
        assert_eq!(throttled.next().await, Some(1));
        tx.send(2).unwrap();
        drop(tx);

        assert_eq!(throttled.next().await, Some(2));
        assert_eq!(throttled.next().await, None);
    }
}
