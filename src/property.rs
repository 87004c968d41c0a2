use std::{
    cell::{Ref, RefCell, RefMut},
    marker::PhantomData,
    ops::{Deref, DerefMut, Index, IndexMut},
    rc::{Rc, Weak},
};

use crate::{
    element::{EH, FH, HH, Handle, VH},
    error::Error,
};

/// Keeps weak references to all properties defined on one kind of element, so
/// they can be kept in sync when elements are added or compacted.
pub(crate) struct PropertyContainer<H>
where
    H: Handle,
{
    props: Vec<Box<dyn GenericProperty<H>>>,
    length: usize,
    _phantom: PhantomData<H>,
}

impl<H> Default for PropertyContainer<H>
where
    H: Handle,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<H> PropertyContainer<H>
where
    H: Handle,
{
    pub fn new() -> Self {
        PropertyContainer {
            props: Vec::new(),
            length: 0,
            _phantom: PhantomData,
        }
    }

    fn push_property(&mut self, prop: Box<dyn GenericProperty<H>>) {
        self.props.push(prop);
    }

    pub fn push_value(&mut self) -> Result<(), Error> {
        let (count, err) = self
            .props
            .iter_mut()
            .fold((0usize, Ok(())), |(count, err), prop| match err {
                Ok(()) => match prop.push() {
                    Ok(()) => (count + 1, Ok(())),
                    Err(e) => (count, Err(e)),
                },
                Err(e) => (count, Err(e)),
            });
        // Undo the partial push.
        if err.is_err() {
            for prop in self.props.iter_mut().take(count) {
                prop.truncate(self.length)?;
            }
            return err;
        }
        self.length += 1;
        Ok(())
    }

    /// Keep only the values whose flag in `keep` is set, preserving their
    /// order. This mirrors the compaction of the elements themselves.
    pub fn compact(&mut self, keep: &[bool]) -> Result<(), Error> {
        debug_assert_eq!(keep.len(), self.length);
        for prop in self.props.iter_mut() {
            prop.compact(keep)?;
        }
        self.length = keep.iter().filter(|k| **k).count();
        Ok(())
    }

    /// True if any live property is currently borrowed. Topological edits
    /// resize the properties, so they cannot proceed while this is true.
    pub fn is_borrowed(&self) -> bool {
        self.props.iter().any(|prop| prop.is_borrowed())
    }

    pub fn len(&self) -> usize {
        self.length
    }

    /// Forget the properties that were dropped by their owners.
    pub fn garbage_collection(&mut self) {
        self.props.retain(|prop| prop.is_valid())
    }

    #[cfg(test)]
    pub fn num_properties(&self) -> usize {
        self.props.len()
    }
}

trait GenericProperty<H>
where
    H: Handle,
{
    fn push(&mut self) -> Result<(), Error>;

    fn truncate(&mut self, n: usize) -> Result<(), Error>;

    fn compact(&mut self, keep: &[bool]) -> Result<(), Error>;

    fn is_borrowed(&self) -> bool;

    fn is_valid(&self) -> bool;
}

/// Values of a property, indexed by the handles of type `H`. Derefs to a
/// plain slice for bulk copies.
pub struct PropBuf<H, T>
where
    H: Handle,
    T: Clone + Copy,
{
    buf: Vec<T>,
    _phantom: PhantomData<H>,
}

impl<H, T> Index<H> for PropBuf<H, T>
where
    H: Handle,
    T: Clone + Copy,
{
    type Output = T;

    fn index(&self, handle: H) -> &Self::Output {
        &self.buf[handle.index() as usize]
    }
}

impl<H, T> IndexMut<H> for PropBuf<H, T>
where
    H: Handle,
    T: Copy + Clone,
{
    fn index_mut(&mut self, h: H) -> &mut Self::Output {
        &mut self.buf[h.index() as usize]
    }
}

impl<H, T> Deref for PropBuf<H, T>
where
    H: Handle,
    T: Clone + Copy,
{
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl<H, T> DerefMut for PropBuf<H, T>
where
    H: Handle,
    T: Clone + Copy,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

/// Value of type `T` attached to every element with handle type `H`.
///
/// Properties are how side tables such as scratch subdivision positions are
/// attached to a mesh. A plain [`Vec<T>`] goes out of sync as soon as the mesh
/// gains new elements, or is compacted by garbage collection. A
/// [`Property<H, T>`] is registered with the mesh, so every element, including
/// the ones created after the property, has a value associated with it. New
/// elements get the default value the property was created with.
#[derive(Clone)]
pub struct Property<H, T>
where
    H: Handle,
    T: Clone + Copy,
{
    data: Rc<RefCell<PropBuf<H, T>>>,
    default: T,
}

impl<H, T> Property<H, T>
where
    H: Handle + 'static,
    T: Clone + Copy + 'static,
{
    pub(crate) fn new(container: &mut PropertyContainer<H>, default: T) -> Self {
        let prop = Property {
            data: Rc::new(RefCell::new(PropBuf {
                buf: vec![default; container.len()],
                _phantom: PhantomData,
            })),
            default,
        };
        container.push_property(prop.generic_ref());
        prop
    }

    fn generic_ref(&self) -> Box<dyn GenericProperty<H>> {
        Box::new(WeakProperty::<H, T> {
            data: Rc::downgrade(&self.data),
            default: self.default,
        })
    }

    /// Shared access to the values. Fails with
    /// [`Error::BorrowedPropertyAccess`] while the values are mutably
    /// borrowed.
    pub fn try_borrow(&self) -> Result<Ref<'_, PropBuf<H, T>>, Error> {
        self.data
            .try_borrow()
            .map_err(|_| Error::BorrowedPropertyAccess)
    }

    /// Exclusive access to the values.
    pub fn try_borrow_mut(&mut self) -> Result<RefMut<'_, PropBuf<H, T>>, Error> {
        self.data
            .try_borrow_mut()
            .map_err(|_| Error::BorrowedPropertyAccess)
    }

    /// Copy of the value of `h`.
    pub fn get_cloned(&self, h: H) -> Result<T, Error> {
        let buf = self.try_borrow()?;
        buf.buf
            .get(h.index() as usize)
            .copied()
            .ok_or(Error::PropertyIndexOutOfBounds(h.index()))
    }

    pub fn set(&mut self, h: H, val: T) -> Result<(), Error> {
        let mut buf = self.try_borrow_mut()?;
        let dst = buf
            .buf
            .get_mut(h.index() as usize)
            .ok_or(Error::PropertyIndexOutOfBounds(h.index()))?;
        *dst = val;
        Ok(())
    }

    pub fn len(&self) -> Result<usize, Error> {
        Ok(self.try_borrow()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len()? == 0)
    }
}

/// Value of type `T` on every vertex.
///
/// ```rust
/// use meshedit::PolyMesh;
///
/// let mut mesh = PolyMesh::icosahedron(1.0).expect("Cannot create an icosahedron");
/// // Create a vertex property of type u32, with a default value of 42.
/// let vprop = mesh.create_vertex_prop(42u32);
/// let v = 2u32.into(); // Vertex indexed 2.
/// assert_eq!(42, vprop.get_cloned(v).expect("Cannot read vertex property"));
/// ```
pub type VProperty<T> = Property<VH, T>;
/// Value of type `T` on every halfedge.
pub type HProperty<T> = Property<HH, T>;
/// Value of type `T` on every edge.
pub type EProperty<T> = Property<EH, T>;
/// Value of type `T` on every face.
pub type FProperty<T> = Property<FH, T>;

/// Handle held by the container. It grows and compacts the values without
/// keeping them alive.
struct WeakProperty<H, T>
where
    H: Handle,
    T: Clone + Copy,
{
    data: Weak<RefCell<PropBuf<H, T>>>,
    default: T,
}

impl<H, T> GenericProperty<H> for WeakProperty<H, T>
where
    T: Clone + Copy,
    H: Handle,
{
    fn push(&mut self) -> Result<(), Error> {
        if let Some(prop) = self.data.upgrade() {
            prop.try_borrow_mut()
                .map_err(|_| Error::BorrowedPropertyAccess)?
                .buf
                .push(self.default);
        }
        Ok(())
    }

    fn truncate(&mut self, n: usize) -> Result<(), Error> {
        if let Some(prop) = self.data.upgrade() {
            prop.try_borrow_mut()
                .map_err(|_| Error::BorrowedPropertyAccess)?
                .buf
                .truncate(n);
        }
        Ok(())
    }

    fn compact(&mut self, keep: &[bool]) -> Result<(), Error> {
        if let Some(prop) = self.data.upgrade() {
            let mut prop = prop
                .try_borrow_mut()
                .map_err(|_| Error::BorrowedPropertyAccess)?;
            let mut flags = keep.iter();
            prop.buf.retain(|_| *flags.next().unwrap_or(&false));
        }
        Ok(())
    }

    fn is_borrowed(&self) -> bool {
        match self.data.upgrade() {
            Some(prop) => prop.try_borrow_mut().is_err(),
            None => false,
        }
    }

    fn is_valid(&self) -> bool {
        self.data.upgrade().is_some()
    }
}

#[cfg(test)]
mod test {
    use super::{PropertyContainer, VProperty};
    use crate::{element::VH, error::Error};

    #[test]
    fn t_garbage_collection() {
        let mut container = PropertyContainer::<VH>::new();
        assert_eq!(container.num_properties(), 0);
        {
            let _prop = VProperty::<u8>::new(&mut container, 0);
            assert_eq!(container.num_properties(), 1);
            container.garbage_collection();
            assert_eq!(container.num_properties(), 1);
        }
        // Property was dropped, so it should be removed.
        container.garbage_collection();
        assert_eq!(container.num_properties(), 0);
    }

    #[test]
    fn t_push_and_compact() {
        let mut container = PropertyContainer::<VH>::new();
        let mut prop = VProperty::<u32>::new(&mut container, 7);
        for _ in 0..5 {
            container.push_value().expect("Cannot push value");
        }
        assert_eq!(prop.len().expect("Cannot read property"), 5);
        for i in 0u32..5 {
            prop.set(i.into(), i * 10).expect("Cannot set property");
        }
        container
            .compact(&[true, false, true, false, true])
            .expect("Cannot compact");
        assert_eq!(container.len(), 3);
        let buf = prop.try_borrow().expect("Cannot borrow property");
        let vals: &[u32] = &buf;
        assert_eq!(vals, &[0, 20, 40]);
    }

    #[test]
    fn t_borrowed_property_blocks_push() {
        let mut container = PropertyContainer::<VH>::new();
        let prop = VProperty::<f32>::new(&mut container, 0.0);
        container.push_value().expect("Cannot push value");
        {
            let _buf = prop.try_borrow().expect("Cannot borrow property");
            assert!(container.is_borrowed());
            assert!(container.push_value().is_err());
            assert_eq!(container.len(), 1);
        }
        assert!(!container.is_borrowed());
        container.push_value().expect("Cannot push value");
        assert_eq!(prop.len().expect("Cannot read property"), 2);
    }

    #[test]
    fn t_out_of_range_access() {
        let mut container = PropertyContainer::<VH>::new();
        let mut prop = VProperty::<u32>::new(&mut container, 3);
        container.push_value().expect("Cannot push value");
        assert_eq!(3, prop.get_cloned(0u32.into()).expect("Cannot read property"));
        assert!(matches!(
            prop.get_cloned(1u32.into()),
            Err(Error::PropertyIndexOutOfBounds(1))
        ));
        assert!(matches!(
            prop.set(5u32.into(), 1),
            Err(Error::PropertyIndexOutOfBounds(5))
        ));
        assert_eq!(1, prop.len().expect("Cannot read property"));
    }
}
