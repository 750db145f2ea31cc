use chrono::Utc;
use serde::Serialize;

use crate::ImagePayload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedPoster {
    pub id: String,
    pub src: ImagePayload,
}

impl GeneratedPoster {
    pub fn new(id: impl Into<String>, src: ImagePayload) -> Self {
        Self { id: id.into(), src }
    }

    /// Name the poster is saved under when downloaded.
    pub fn file_name(&self) -> String {
        format!("poster-{}.png", self.id)
    }
}

/// Posters generated during a session, oldest first, plus the one on display.
#[derive(Debug, Clone, Default)]
pub struct PosterCollection {
    posters: Vec<GeneratedPoster>,
    active_id: Option<String>,
    last_stamp: i64,
}

impl PosterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Millisecond timestamp id, bumped when two posters land in the same
    /// millisecond.
    pub fn next_id(&mut self) -> String {
        let stamp = Utc::now().timestamp_millis().max(self.last_stamp + 1);
        self.last_stamp = stamp;
        stamp.to_string()
    }

    /// Appends `poster` and makes it active. Ids already in the collection
    /// are refused.
    pub fn append(&mut self, poster: GeneratedPoster) -> bool {
        if self.contains(&poster.id) {
            return false;
        }
        if let Ok(stamp) = poster.id.parse::<i64>() {
            self.last_stamp = self.last_stamp.max(stamp);
        }
        self.active_id = Some(poster.id.clone());
        self.posters.push(poster);
        true
    }

    /// Stores a freshly generated image under a new id and returns that id.
    pub fn push_image(&mut self, src: ImagePayload) -> String {
        let id = self.next_id();
        let appended = self.append(GeneratedPoster::new(id.clone(), src));
        debug_assert!(appended);
        id
    }

    pub fn set_active(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.active_id = Some(id.to_string());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.posters.iter().any(|p| p.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&GeneratedPoster> {
        self.posters.iter().find(|p| p.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active(&self) -> Option<&GeneratedPoster> {
        self.active_id.as_deref().and_then(|id| self.get(id))
    }

    /// What the canvas shows: the active poster, else `fallback` (the cut-out
    /// product), else nothing.
    pub fn active_image<'a>(
        &'a self,
        fallback: Option<&'a ImagePayload>,
    ) -> Option<&'a ImagePayload> {
        self.active().map(|p| &p.src).or(fallback)
    }

    pub fn as_slice(&self) -> &[GeneratedPoster] {
        &self.posters
    }

    pub fn len(&self) -> usize {
        self.posters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(tag: &str) -> ImagePayload {
        ImagePayload::new("image/png", tag.as_bytes().to_vec())
    }

    #[test]
    fn append_keeps_order_and_activates_newest() {
        let mut posters = PosterCollection::new();
        let first = posters.push_image(image("a"));
        let second = posters.push_image(image("b"));
        let third = posters.push_image(image("c"));

        let ids: Vec<_> = posters.as_slice().iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec![first, second, third.clone()]);
        assert_eq!(posters.active_id(), Some(third.as_str()));
        assert_eq!(posters.len(), 3);
    }

    #[test]
    fn ids_are_unique_and_increasing_within_a_millisecond() {
        let mut posters = PosterCollection::new();
        let ids: Vec<i64> = (0..50)
            .map(|_| posters.next_id().parse().unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn duplicate_ids_are_refused() {
        let mut posters = PosterCollection::new();
        assert!(posters.append(GeneratedPoster::new("1", image("a"))));
        assert!(!posters.append(GeneratedPoster::new("1", image("b"))));
        assert_eq!(posters.len(), 1);
        assert_eq!(posters.active().unwrap().src, image("a"));
    }

    #[test]
    fn set_active_ignores_unknown_ids() {
        let mut posters = PosterCollection::new();
        let first = posters.push_image(image("a"));
        let second = posters.push_image(image("b"));

        assert!(posters.set_active(&first));
        assert_eq!(posters.active_id(), Some(first.as_str()));

        assert!(!posters.set_active("nope"));
        assert_eq!(posters.active_id(), Some(first.as_str()));

        assert!(posters.set_active(&second));
        assert_eq!(posters.active().unwrap().src, image("b"));
    }

    #[test]
    fn active_image_falls_back_to_product() {
        let product = image("product");
        let mut posters = PosterCollection::new();
        assert_eq!(posters.active_image(None), None);
        assert_eq!(posters.active_image(Some(&product)), Some(&product));

        posters.push_image(image("poster"));
        assert_eq!(posters.active_image(Some(&product)), Some(&image("poster")));
    }

    #[test]
    fn file_name_uses_poster_id() {
        let poster = GeneratedPoster::new("1718000000000", image("a"));
        assert_eq!(poster.file_name(), "poster-1718000000000.png");
    }
}
