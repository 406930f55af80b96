pub trait ContainerRead {
    /// the number of values in this container.
    fn cardinality(&self) -> usize;

    /// returns true if this container is empty
    fn is_empty(&self) -> bool {
        self.cardinality() == 0
    }

    /// returns true if this container contains the given value
    fn contains(&self, value: u16) -> bool;

    /// returns the largest value in the container
    fn last(&self) -> Option<u16>;

    /// returns an ascending iterator over all values in this container
    fn iter(&self) -> impl Iterator<Item = u16>;
}
