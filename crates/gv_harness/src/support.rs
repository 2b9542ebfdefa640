//! The fixed runtime-support unit linked into every generated test.
//!
//! Generated chunks speak the narrow harness API declared in
//! `gv_support.h`; this unit adapts it onto the collector's public
//! `gc.h` interface and keeps the handle/identity bookkeeping the
//! verification pass needs. It is the only place that knows the
//! collector's actual symbol names.

pub const SUPPORT_HEADER_NAME: &str = "gv_support.h";
pub const SUPPORT_SOURCE_NAME: &str = "gv_support.c";

pub const SUPPORT_HEADER: &str = r#"#ifndef GV_SUPPORT_H
#define GV_SUPPORT_H

#include <stdint.h>

/* sentinel for "clear this reference slot" */
#define GV_NO_REF 0xFFFFFFFFu

void harness_init(uint32_t total_allocated, uint32_t expected_survivors);
void create_object(uint32_t identity, uint32_t handle, uint32_t slot_count);
void set_reference(uint32_t handle, uint32_t slot_index, uint32_t target_handle);
void add_root(uint32_t handle);
void remove_root(uint32_t handle);
void run_collection(void);
void dump_state(void);
void millisleep(uint32_t millis);
void drop_handle(uint32_t handle);
void expect_garbage(uint32_t identity);
void end_of_test(void);

#endif
"#;

pub const SUPPORT_SOURCE: &str = r#"#include <stdio.h>
#include <stdint.h>
#include <stdlib.h>
#include <string.h>
#include <time.h>
#include "gv_support.h"
#include "gc.h"

/* growable pointer array, indexed by handle or identity */
typedef struct {
    uint32_t size;
    void** data;
} gv_array;

static gv_array* gv_array_create(uint32_t initial_size) {
    gv_array* a = (gv_array*)malloc(sizeof(gv_array));
    a->size = initial_size;
    a->data = (void**)malloc(sizeof(void*) * initial_size);
    memset(a->data, 0, a->size * sizeof(void*));
    return a;
}

static void gv_array_free(gv_array* a) {
    free(a->data);
    free(a);
}

static void gv_array_set(gv_array* a, uint32_t i, void* v) {
    if (i >= a->size) {
        uint32_t ps = a->size;
        a->size = i + 1000;
        a->data = (void**)realloc(a->data, sizeof(void*) * a->size);
        memset(a->data + ps, 0, (a->size - ps) * sizeof(void*));
    }
    a->data[i] = v;
}

static void* gv_array_get(gv_array* a, uint32_t i) {
    if (i >= a->size)
        return 0;
    return a->data[i];
}

static gc_object_class cls;
static uint32_t expected_survivors_count = 0;
static uint32_t total_objects_allocated = 0;
static uint32_t garbage_collected_count = 0;
static uint32_t survivors_count = 0;
static uint32_t total_gc_calls = 0;
static uint64_t total_gc_time = 0;
static uint64_t start_time = 0;
static gv_array* objects;
static gv_array* all_objects;

static void garbage_collected_finalize(gc_object* obj) {
    garbage_collected_count += 1;
}

static void survivors_finalize(gc_object* obj) {
    survivors_count += 1;
}

void harness_init(uint32_t total_allocated, uint32_t expected_survivors) {
    total_objects_allocated = total_allocated;
    expected_survivors_count = expected_survivors;

    cls.gc_mark_black = &gc_object_mark_black;
    cls.gc_contains = &gc_object_contains;
    cls.gc_finalize = &garbage_collected_finalize;

    gc_config config;
    gc_gen_config c[3];
    c[0].refresh_interval = 500000ull;
    c[0].promotion_interval = 1000000ull;
    c[1].refresh_interval = 2000000ull;
    c[1].promotion_interval = 6000000ull;
    c[2].refresh_interval = 250000000ull;
    c[2].promotion_interval = 0;
    config.gens_count = 3;
    config.gens = c;
    config.pause_threshold = 100;
    config.max_pause = 200000000;
    gc_init(&config);

    objects = gv_array_create(10000);
    all_objects = gv_array_create(10000);
    start_time = get_nanotime();
}

void create_object(uint32_t identity, uint32_t handle, uint32_t slot_count) {
    gc_object* obj = gc_alloc(slot_count);
    obj->class = &cls;
    gv_array_set(objects, handle, obj);
    gv_array_set(all_objects, identity, obj);
}

void set_reference(uint32_t handle, uint32_t slot_index, uint32_t target_handle) {
    gc_object* target = 0;
    if (target_handle != GV_NO_REF)
        target = (gc_object*)gv_array_get(objects, target_handle);
    gc_set_ref((gc_object*)gv_array_get(objects, handle), slot_index, target);
}

void add_root(uint32_t handle) {
    gc_add_root((gc_object*)gv_array_get(objects, handle));
}

void remove_root(uint32_t handle) {
    gc_remove_root((gc_object*)gv_array_get(objects, handle));
}

static void collect_once(void) {
    uint64_t spent = gc();
    total_gc_time += spent;
    gc_config* c = gc_get_config();
    printf("gc collected %d objects took %.2f millis [", c->cycle_collected,
           ((double)c->cycle_duration) / 1000000);
    for (uint8_t i = 0; i < c->gens_count; ++i) {
        printf(" %d/%d", c->gens[i].cycle_promoted, c->gens[i].cycle_refreshed);
    }
    printf(" ]\n");
}

void run_collection(void) {
    total_gc_calls += 1;
    collect_once();
}

void dump_state(void) {
    gc_print();
}

void millisleep(uint32_t millis) {
    struct timespec t;
    t.tv_sec = millis / 1000;
    t.tv_nsec = (millis % 1000) * 1000000;
    nanosleep(&t, 0);
}

void drop_handle(uint32_t handle) {
    gv_array_set(objects, handle, 0);
}

void expect_garbage(uint32_t identity) {
    gv_array_set(all_objects, identity, 0);
}

static void check_survivors(void) {
    uint32_t found = 0;
    for (uint32_t i = 0; i < all_objects->size; ++i) {
        gc_object* obj = (gc_object*)gv_array_get(all_objects, i);
        if (obj != 0) {
            if (!gc_contains(obj)) {
                printf("object %u %p not found, incorrect gc behaviour, test failed\n",
                       i, (void*)obj);
            } else {
                ++found;
            }
        }
    }
    printf("checked objects that survived: %u\n", found);
}

void end_of_test(void) {
    printf("test ended, took %.2f millis\n",
           ((double)(get_nanotime() - start_time)) / 1000000);

    /* force promotion into the last generation, then collect until
       a full cycle has run, so the check sees a settled heap */
    gc_config* config = gc_get_config();
    for (uint8_t i = 0; i < config->gens_count; ++i) {
        config->gens[i].promotion_interval = 1;
    }
    config->gens[config->gens_count - 1].refresh_interval = 1;
    collect_once();
    config->gens[config->gens_count - 1].refresh_interval = 1000000000ull;
    while (!config->cycle_full) {
        collect_once();
    }

    check_survivors();

    gv_array_free(all_objects);
    gv_array_free(objects);

    /* everything still held at destroy time is an actual survivor */
    cls.gc_finalize = &survivors_finalize;
    gc_destroy();

    printf("garbage collected %u\n", garbage_collected_count);
    printf("actual survivors %u\n", survivors_count);
    if (survivors_count + garbage_collected_count != total_objects_allocated)
        printf("total objects don't match actual survivors + garbage collected objects\n");
    if (survivors_count != expected_survivors_count)
        printf("expected survivors don't match actual survivors %u != %u\n",
               expected_survivors_count, survivors_count);
    else
        printf("expected survivors match actual survivors\n");
    printf("total gc calls: %u\n", total_gc_calls);
    printf("total time spent in gc: %.2f millis\n", ((double)total_gc_time) / 1000000);
}
"#;
