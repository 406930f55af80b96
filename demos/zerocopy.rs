use roaring_container_codec::{
    ArrayContainer, BitmapContainer, Codec, ContainerRead, Encodable, Interval, interval_view,
    testutil::SetGen,
};

fn main() {
    let mut setgen = SetGen::new(0xDEAD_BEEF);

    // resolved once from ROARING_CODEC_MODE, falling back to host detection
    let codec = Codec::global();
    println!("Codec mode: {}", codec.mode());

    // a blob holding an array container followed by a bitmap container
    let array = ArrayContainer::from_iter(setgen.random(64));
    let bitmap = BitmapContainer::from_iter(setgen.random(10000));
    let mut blob = vec![];
    codec.write_array(&array, &mut blob).unwrap();
    codec.write_bitmap(&bitmap, &mut blob).unwrap();
    println!("Serialized blob size: {} bytes", blob.len());

    println!("First 16 bytes of the array payload:");
    for byte in blob.iter().take(16) {
        print!("{byte:02X} ");
    }
    println!();

    // decode both containers in place; the cardinality of the array comes
    // from the parent format
    let (array_ref, rest) = codec.decode_array(&blob, array.cardinality()).unwrap();
    let (bitmap_ref, rest) = codec.decode_bitmap(rest).unwrap();
    assert!(rest.is_empty());

    println!(
        "array: {} values (aliased: {}), bitmap: {} values (aliased: {})",
        array_ref.cardinality(),
        array_ref.is_aliased(),
        bitmap_ref.cardinality(),
        bitmap_ref.is_aliased(),
    );
    assert_eq!(array_ref, array);
    assert_eq!(bitmap_ref, bitmap);

    // detach from the blob when the container must outlive it
    let owned = array_ref.into_owned();
    drop(blob);
    assert_eq!(owned, array);

    // run containers are handled elsewhere, but their pairs can be viewed here
    let runs = [Interval::new(10, 4), Interval::new(100, 0)];
    let buf = runs.as_slice().encode_to_bytes();
    for run in interval_view(&buf) {
        println!("run start={} length={}", run.start(), run.length());
    }

    println!("Success!");
}
