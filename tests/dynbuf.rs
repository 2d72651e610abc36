extern crate lodge;

use lodge::utils::prelude::*;

#[test]
fn append_returns_index() {
    let mut buf = DynBuf::new();
    for i in 0..100 {
        assert_eq!(buf.append(i * 2).unwrap(), i);
        assert!(buf.len() <= buf.capacity());
    }

    assert_eq!(buf.len(), 100);
    assert_eq!(buf.get(50), Some(&100));
    assert_eq!(buf.iter().sum::<usize>(), 9900);
}

#[test]
fn capacity_doubles() {
    let mut buf = DynBuf::with_capacity(3).unwrap();
    let mut capacity = buf.capacity();

    for i in 0..64 {
        buf.append(i).unwrap();
        if buf.capacity() != capacity {
            assert!(buf.capacity() >= capacity * 2);
            capacity = buf.capacity();
        }
    }
}

#[test]
fn retain_and_remove() {
    let mut buf = DynBuf::new();
    for i in 0..10 {
        buf.append(i).unwrap();
    }

    buf.retain(|v| v % 3 != 0);
    assert_eq!(&buf[..], &[1, 2, 4, 5, 7, 8]);

    assert_eq!(buf.position(&5), Some(3));
    buf.remove(3);
    assert_eq!(buf.position(&5), None);

    for v in buf.iter_mut() {
        *v *= 10;
    }

    assert_eq!(buf.into_iter().collect::<Vec<_>>(), vec![10, 20, 40, 70, 80]);
}
