//! Spoken time as a queue of sample numbers for the MP3 player.
//!
//! Sentences are Dutch: "het is nu kwart over drie", "tien voor half vier".

use heapless::Vec;

use crate::clock::{ChangeEdges, ChangeListener, ClockReading};

/// Longest sentence the player is asked to speak.
pub const MAX_WORDS: usize = 5;

/// One spoken word and the sample that holds it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Word {
    /// 1 to 14, stored as their own sample number.
    Number(u8),
    Half,
    Quarter,
    ItIsNow,
    Past,
    To,
    Hour,
}

impl Word {
    pub fn sample(self) -> u8 {
        match self {
            Word::Number(n) => n,
            Word::Half => 15,
            Word::Quarter => 16,
            Word::ItIsNow => 17,
            Word::Past => 18,
            Word::To => 19,
            Word::Hour => 20,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sentence {
    words: Vec<Word, MAX_WORDS>,
}

impl Sentence {
    /// Phrase for a 12 hour time. `hour` 0 is spoken as twelve.
    pub fn for_time(hour: u8, minute: u8) -> Self {
        let hour = hour % 12;
        let minute = minute % 60;
        let after = if hour == 0 { 12 } else { hour };
        let before = if hour % 12 == 0 { 1 } else { hour + 1 };

        let mut sentence = Sentence::default();
        sentence.push(Word::ItIsNow);

        match (minute / 15, minute % 15 == 0) {
            (0, true) => sentence.extend(&[Word::Number(after), Word::Hour]),
            (1, true) => sentence.extend(&[Word::Quarter, Word::Past, Word::Number(after)]),
            (2, true) => sentence.extend(&[Word::Half, Word::Number(before)]),
            (3, true) => sentence.extend(&[Word::Quarter, Word::To, Word::Number(before)]),
            (0, false) => sentence.extend(&[Word::Number(minute), Word::Past, Word::Number(after)]),
            (1, false) => sentence.extend(&[
                Word::Number(30 - minute),
                Word::To,
                Word::Half,
                Word::Number(before),
            ]),
            (2, false) => sentence.extend(&[
                Word::Number(minute - 30),
                Word::Past,
                Word::Half,
                Word::Number(before),
            ]),
            _ => sentence.extend(&[Word::Number(60 - minute), Word::To, Word::Number(before)]),
        }

        sentence
    }

    fn push(&mut self, word: Word) {
        let pushed = self.words.push(word);
        debug_assert!(pushed.is_ok(), "sentence longer than MAX_WORDS");
    }

    fn extend(&mut self, words: &[Word]) {
        for word in words {
            self.push(*word);
        }
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Feeds sentences to the player one word at a time.
#[derive(Debug, Default)]
pub struct SpeechQueue {
    sentence: Sentence,
    next: usize,
}

impl SpeechQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever is still pending.
    pub fn say(&mut self, sentence: Sentence) {
        self.sentence = sentence;
        self.next = 0;
    }

    /// Sample number of the next word, if any.
    pub fn next_word(&mut self) -> Option<u8> {
        let word = self.sentence.words().get(self.next).copied();
        match word {
            Some(word) => {
                self.next += 1;
                Some(word.sample())
            }
            None => {
                self.clear();
                None
            }
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.next < self.sentence.len()
    }

    pub fn clear(&mut self) {
        self.sentence = Sentence::default();
        self.next = 0;
    }
}

impl ChangeListener for SpeechQueue {
    fn on_tick(&mut self, edges: &ChangeEdges, reading: &ClockReading) {
        if edges.five_minute_changed() {
            debug!("Announcing {}:{}", reading.hour(), reading.minute());
            self.say(Sentence::for_time(reading.hour(), reading.minute()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FiveMinuteEdge;

    fn samples(hour: u8, minute: u8) -> std::vec::Vec<u8> {
        Sentence::for_time(hour, minute)
            .words()
            .iter()
            .map(|w| w.sample())
            .collect()
    }

    #[test]
    fn full_and_quarter_hours() {
        assert_eq!(samples(0, 0), [17, 12, 20]);
        assert_eq!(samples(3, 15), [17, 16, 18, 3]);
        assert_eq!(samples(3, 30), [17, 15, 4]);
        assert_eq!(samples(11, 45), [17, 16, 19, 12]);
    }

    #[test]
    fn minutes_around_the_half() {
        // vijf over drie
        assert_eq!(samples(3, 5), [17, 5, 18, 3]);
        // tien voor half vier
        assert_eq!(samples(3, 20), [17, 10, 19, 15, 4]);
        // vijf over half vier
        assert_eq!(samples(3, 35), [17, 5, 18, 15, 4]);
        // vijf voor een
        assert_eq!(samples(0, 55), [17, 5, 19, 1]);
    }

    #[test]
    fn every_minute_fits_the_sample_set() {
        for hour in 0..12 {
            for minute in 0..60 {
                let sentence = Sentence::for_time(hour, minute);
                assert!(sentence.len() <= MAX_WORDS);
                assert!(sentence.words().iter().all(|w| (1..=20).contains(&w.sample())));
            }
        }
    }

    #[test]
    fn queue_speaks_on_five_minute_edges_only() {
        let mut queue = SpeechQueue::new();
        let reading = ClockReading::new(3, 15, 0);

        queue.on_tick(&ChangeEdges::default(), &reading);
        assert!(!queue.is_speaking());

        let edges = ChangeEdges {
            five_minute: Some(FiveMinuteEdge::Quarter),
            any_changed: true,
            ..ChangeEdges::default()
        };
        queue.on_tick(&edges, &reading);
        assert!(queue.is_speaking());

        let spoken: std::vec::Vec<u8> = core::iter::from_fn(|| queue.next_word()).collect();
        assert_eq!(spoken, [17, 16, 18, 3]);
        assert!(!queue.is_speaking());
        assert_eq!(queue.next_word(), None);
    }
}
